//! Strongly typed identifiers for the principals the IAM Credentials API acts on.

// std
use std::{borrow::Borrow, ops::Deref};
// self
use crate::_prelude::*;

macro_rules! def_id {
	($name:ident, $doc:literal, $kind:literal) => {
		#[doc = $doc]
		#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
		#[serde(try_from = "String", into = "String")]
		pub struct $name(String);
		impl $name {
			/// Creates a new identifier after validation.
			pub fn new(value: impl AsRef<str>) -> Result<Self, IdentifierError> {
				let view = value.as_ref();

				validate_view($kind, view)?;

				Ok(Self(view.to_owned()))
			}
		}
		impl Deref for $name {
			type Target = str;

			fn deref(&self) -> &Self::Target {
				&self.0
			}
		}
		impl AsRef<str> for $name {
			fn as_ref(&self) -> &str {
				&self.0
			}
		}
		impl From<$name> for String {
			fn from(value: $name) -> Self {
				value.0
			}
		}
		impl TryFrom<String> for $name {
			type Error = IdentifierError;

			fn try_from(value: String) -> Result<Self, Self::Error> {
				validate_view($kind, &value)?;

				Ok(Self(value))
			}
		}
		impl Borrow<str> for $name {
			fn borrow(&self) -> &str {
				&self.0
			}
		}
		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				write!(f, concat!($kind, "({})"), self.0)
			}
		}
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter) -> FmtResult {
				f.write_str(&self.0)
			}
		}
		impl FromStr for $name {
			type Err = IdentifierError;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Self::new(s)
			}
		}
	};
}

const IDENTIFIER_MAX_LEN: usize = 254;
const PROJECTS_SEGMENT: &str = "projects";
const SERVICE_ACCOUNTS_SEGMENT: &str = "serviceAccounts";
// `:` starts the custom method suffix; `?` and `#` would move it out of the path.
const RESERVED_CHARACTERS: [char; 3] = [':', '?', '#'];

/// Error returned when identifier validation fails.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ThisError)]
pub enum IdentifierError {
	/// The identifier was empty.
	#[error("{kind} identifier cannot be empty.")]
	Empty {
		/// Kind of identifier (project, service account).
		kind: &'static str,
	},
	/// The identifier contains whitespace characters.
	#[error("{kind} identifier contains whitespace.")]
	ContainsWhitespace {
		/// Kind of identifier (project, service account).
		kind: &'static str,
	},
	/// The identifier contains a path separator.
	#[error("{kind} identifier contains `/`.")]
	ContainsSlash {
		/// Kind of identifier (project, service account).
		kind: &'static str,
	},
	/// The identifier contains a character that would change the meaning of a request URL.
	#[error("{kind} identifier contains reserved character `{character}`.")]
	ReservedCharacter {
		/// Kind of identifier (project, service account).
		kind: &'static str,
		/// First offending character.
		character: char,
	},
	/// The identifier exceeded the allowed character count.
	#[error("{kind} identifier exceeds {max} characters.")]
	TooLong {
		/// Kind of identifier (project, service account).
		kind: &'static str,
		/// Maximum permitted character count.
		max: usize,
	},
	/// A resource name did not follow `projects/{project}/serviceAccounts/{account}`.
	#[error("Resource name `{value}` is not of the form projects/{{project}}/serviceAccounts/{{account}}.")]
	MalformedResourceName {
		/// Rejected input.
		value: String,
	},
}

def_id! { ProjectId, "Project that owns a service account (`-` lets the API infer it).", "Project" }
def_id! {
	ServiceAccountId,
	"Service account email address or numeric unique identifier.",
	"ServiceAccount"
}

/// Full resource name of a service account:
/// `projects/{project}/serviceAccounts/{email-or-unique-id}`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ServiceAccountName {
	/// Owning project; `-` is the wildcard the API resolves from the account.
	pub project: ProjectId,
	/// Email or unique id of the account.
	pub account: ServiceAccountId,
}
impl ServiceAccountName {
	/// Project wildcard accepted by the IAM Credentials API.
	pub const WILDCARD_PROJECT: &'static str = "-";

	/// Builds a name for `account` under the wildcard project.
	pub fn new(account: ServiceAccountId) -> Self {
		Self { project: ProjectId(Self::WILDCARD_PROJECT.into()), account }
	}

	/// Builds a name for `account` under an explicit project.
	pub fn with_project(project: ProjectId, account: ServiceAccountId) -> Self {
		Self { project, account }
	}

	/// Parses either a bare account (`sa@project.iam.gserviceaccount.com`) or a full resource
	/// name.
	pub fn parse(value: &str) -> Result<Self, IdentifierError> {
		if !value.contains('/') {
			return Ok(Self::new(ServiceAccountId::new(value)?));
		}

		let mut segments = value.split('/');

		match (segments.next(), segments.next(), segments.next(), segments.next(), segments.next())
		{
			(Some(PROJECTS_SEGMENT), Some(project), Some(SERVICE_ACCOUNTS_SEGMENT), Some(account), None) =>
				Ok(Self::with_project(ProjectId::new(project)?, ServiceAccountId::new(account)?)),
			_ => Err(IdentifierError::MalformedResourceName { value: value.to_owned() }),
		}
	}
}
impl Display for ServiceAccountName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "{PROJECTS_SEGMENT}/{}/{SERVICE_ACCOUNTS_SEGMENT}/{}", self.project, self.account)
	}
}
impl Debug for ServiceAccountName {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "ServiceAccountName({self})")
	}
}
impl FromStr for ServiceAccountName {
	type Err = IdentifierError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}
impl TryFrom<String> for ServiceAccountName {
	type Error = IdentifierError;

	fn try_from(value: String) -> Result<Self, Self::Error> {
		Self::parse(&value)
	}
}
impl From<ServiceAccountName> for String {
	fn from(value: ServiceAccountName) -> Self {
		value.to_string()
	}
}

fn validate_view(kind: &'static str, view: &str) -> Result<(), IdentifierError> {
	if view.is_empty() {
		return Err(IdentifierError::Empty { kind });
	}
	if view.chars().any(char::is_whitespace) {
		return Err(IdentifierError::ContainsWhitespace { kind });
	}
	if view.contains('/') {
		return Err(IdentifierError::ContainsSlash { kind });
	}
	if let Some(character) = view.chars().find(|c| RESERVED_CHARACTERS.contains(c)) {
		return Err(IdentifierError::ReservedCharacter { kind, character });
	}
	if view.len() > IDENTIFIER_MAX_LEN {
		return Err(IdentifierError::TooLong { kind, max: IDENTIFIER_MAX_LEN });
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const EMAIL: &str = "oidc-federated@mineral-minutia-820.iam.gserviceaccount.com";

	#[test]
	fn bare_email_uses_wildcard_project() {
		let name = ServiceAccountName::parse(EMAIL).expect("Bare email should parse.");

		assert_eq!(name.project.as_ref(), "-");
		assert_eq!(name.to_string(), format!("projects/-/serviceAccounts/{EMAIL}"));
	}

	#[test]
	fn full_resource_name_round_trips() {
		let raw = format!("projects/mineral-minutia-820/serviceAccounts/{EMAIL}");
		let name: ServiceAccountName = raw.parse().expect("Resource name should parse.");

		assert_eq!(name.project.as_ref(), "mineral-minutia-820");
		assert_eq!(name.account.as_ref(), EMAIL);
		assert_eq!(name.to_string(), raw);
	}

	#[test]
	fn malformed_names_are_rejected() {
		for raw in [
			"projects/-/serviceAccounts/",
			"projects/-/users/someone@example.com",
			"projects/-/serviceAccounts/a/b",
			"serviceAccounts/someone@example.com",
		] {
			assert!(ServiceAccountName::parse(raw).is_err(), "`{raw}` must be rejected.");
		}

		assert!(matches!(
			ServiceAccountName::parse(""),
			Err(IdentifierError::Empty { kind: "ServiceAccount" })
		));
		assert!(matches!(
			ServiceAccountName::parse("with space@example.com"),
			Err(IdentifierError::ContainsWhitespace { .. })
		));
	}

	#[test]
	fn url_reserved_characters_are_rejected() {
		for (raw, reserved) in [
			("a#b@p.iam.gserviceaccount.com", '#'),
			("a?x=1@p.iam.gserviceaccount.com", '?'),
			("a:signJwt@p.iam.gserviceaccount.com", ':'),
		] {
			assert_eq!(
				ServiceAccountName::parse(raw).expect_err("Reserved character must be rejected."),
				IdentifierError::ReservedCharacter { kind: "ServiceAccount", character: reserved }
			);
		}

		assert!(matches!(
			ServiceAccountName::parse("projects/p#x/serviceAccounts/a@p.iam.gserviceaccount.com"),
			Err(IdentifierError::ReservedCharacter { kind: "Project", character: '#' })
		));
	}

	#[test]
	fn serde_enforces_validation() {
		let name: ServiceAccountName = serde_json::from_str(&format!("\"{EMAIL}\""))
			.expect("Service account should deserialize.");

		assert_eq!(
			serde_json::to_string(&name).expect("Service account should serialize."),
			format!("\"projects/-/serviceAccounts/{EMAIL}\"")
		);
		assert!(serde_json::from_str::<ServiceAccountName>("\"projects/x\"").is_err());
	}

	#[test]
	fn length_limit_applies() {
		let exact = "a".repeat(IDENTIFIER_MAX_LEN);

		ServiceAccountId::new(&exact).expect("Exact length should succeed.");

		assert!(ServiceAccountId::new("a".repeat(IDENTIFIER_MAX_LEN + 1)).is_err());
	}
}
