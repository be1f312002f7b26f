//! Question-title aliases used to lift well-known applicant fields out of a submission.

// self
use crate::_prelude::*;

/// Applicant fields promoted to top-level payload properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KnownField {
	/// Applicant name.
	Name,
	/// Applicant email; the respondent email takes precedence over any alias.
	Email,
	/// School or university.
	School,
	/// Department.
	Department,
	/// Academic year.
	Grade,
	/// Major status.
	Major,
	/// Phone number.
	Phone,
}
impl KnownField {
	/// Every known field in payload order.
	pub const ALL: [Self; 7] =
		[Self::Name, Self::Email, Self::School, Self::Department, Self::Grade, Self::Major, Self::Phone];

	fn default_aliases(self) -> &'static [&'static str] {
		match self {
			Self::Name => &["이름", "성명"],
			Self::Email => &["이메일 주소", "이메일"],
			Self::School => &["대학교", "학교"],
			Self::Department => &["학과", "전공학과"],
			Self::Grade => &["학년"],
			Self::Major => &["전공 여부", "전공"],
			Self::Phone => &["전화번호", "휴대폰 번호"],
		}
	}
}

/// Priority-ordered question titles per [`KnownField`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldAliases(BTreeMap<KnownField, Vec<String>>);
impl FieldAliases {
	/// Replaces the aliases for `field`, keeping their order as priority.
	pub fn with<I, S>(mut self, field: KnownField, aliases: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.0.insert(field, aliases.into_iter().map(Into::into).collect());

		self
	}

	/// Aliases registered for `field`.
	pub fn get(&self, field: KnownField) -> &[String] {
		self.0.get(&field).map(Vec::as_slice).unwrap_or_default()
	}
}
impl Default for FieldAliases {
	fn default() -> Self {
		Self(
			KnownField::ALL
				.into_iter()
				.map(|field| {
					(field, field.default_aliases().iter().map(|alias| alias.to_string()).collect())
				})
				.collect(),
		)
	}
}
