//! models::course
//!
//! Courses and the request that creates one.

use serde::{Deserialize, Serialize};

use crate::scm::ScmProvider;

/// A course bound to a provider directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    /// Local id (> 0 once stored)
    pub id: u64,
    /// Course name
    pub name: String,
    /// Course code, e.g. "DAT320"
    pub code: String,
    /// Year the course runs
    pub year: u32,
    /// Term tag, e.g. "Fall"
    pub tag: String,
    /// Hosting provider
    pub provider: String,
    /// Provider directory (organization / group) id
    #[serde(rename = "directoryid")]
    pub directory_id: u64,
}

/// Body of `POST /api/v1/courses`.
///
/// Every field defaults so that a missing field is reported by
/// [`validate`](Self::validate) instead of failing deserialization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NewCourseRequest {
    pub name: String,
    pub code: String,
    pub year: u32,
    pub tag: String,
    pub provider: String,
    #[serde(rename = "directoryid")]
    pub directory_id: u64,
}

impl NewCourseRequest {
    /// Check every field; on failure, list the invalid ones.
    ///
    /// ```
    /// use agportal::models::NewCourseRequest;
    ///
    /// let req = NewCourseRequest {
    ///     name: "DAT320".into(),
    ///     provider: "bitbucket".into(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(
    ///     req.validate().unwrap_err(),
    ///     vec!["code", "year", "tag", "provider", "directoryid"]
    /// );
    /// ```
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut invalid = Vec::new();
        if self.name.trim().is_empty() {
            invalid.push("name");
        }
        if self.code.trim().is_empty() {
            invalid.push("code");
        }
        if self.year == 0 {
            invalid.push("year");
        }
        if self.tag.trim().is_empty() {
            invalid.push("tag");
        }
        if !ScmProvider::parse(&self.provider).is_some_and(|p| p.hosts_courses()) {
            invalid.push("provider");
        }
        if self.directory_id == 0 {
            invalid.push("directoryid");
        }

        if invalid.is_empty() {
            Ok(())
        } else {
            Err(invalid.into_iter().map(String::from).collect())
        }
    }

    /// The course this request describes, bound to the verified directory id.
    pub fn into_course(self, directory_id: u64) -> Course {
        Course {
            id: 0,
            name: self.name,
            code: self.code,
            year: self.year,
            tag: self.tag,
            provider: self.provider,
            directory_id,
        }
    }
}
