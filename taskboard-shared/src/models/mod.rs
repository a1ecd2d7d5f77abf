/// Database models
///
/// One module per table, each exposing the row struct, its create/update
/// inputs and the queries over it as associated functions.
///
/// - `profile`: User accounts
/// - `project`: Projects, including transactional creation with the owner membership
/// - `project_member`: Membership rows and the [`project_member::ProjectRole`] order
/// - `task`: Tasks, filters and dashboard aggregates
/// - `subtask`: Checklist items under a task
/// - `tag`: Global tag vocabulary and task/tag links
/// - `comment`: Task discussion
/// - `attachment`: File references attached to tasks
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::models::project::{CreateProject, Project};
/// use sqlx::PgPool;
/// use uuid::Uuid;
///
/// # async fn example(pool: PgPool, owner_id: Uuid) -> Result<(), sqlx::Error> {
/// let project = Project::create_with_owner(&pool, CreateProject {
///     name: "Website relaunch".to_string(),
///     description: None,
///     owner_id,
///     color: None,
/// }).await?;
/// # Ok(())
/// # }
/// ```

use serde::{Deserialize, Deserializer};

pub mod attachment;
pub mod comment;
pub mod profile;
pub mod project;
pub mod project_member;
pub mod subtask;
pub mod tag;
pub mod task;

/// Deserializes a field that distinguishes "absent" from "explicitly null"
///
/// Use with `#[serde(default, deserialize_with = "nullable")]` on an
/// `Option<Option<T>>`: a missing key stays `None`, `null` becomes
/// `Some(None)` and a value becomes `Some(Some(v))`.
pub fn nullable<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "nullable")]
        description: Option<Option<String>>,
    }

    #[test]
    fn test_nullable_distinguishes_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(missing.description, None);

        let cleared: Patch = serde_json::from_str(r#"{"description": null}"#).unwrap();
        assert_eq!(cleared.description, Some(None));

        let set: Patch = serde_json::from_str(r#"{"description": "x"}"#).unwrap();
        assert_eq!(set.description, Some(Some("x".to_string())));
    }
}
