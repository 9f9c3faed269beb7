//! models::sanitize
//!
//! Strips remote identities from values leaving the API.

use super::{Group, User};

/// Removes remote identities (and with them, access tokens).
///
/// Implemented for users and groups, and for vectors of any sanitizable
/// value, so one transform covers a user, a user list, a group, and a group
/// list.
///
/// ```
/// use agportal::models::{RemoteIdentity, Sanitize, User};
///
/// let user = User {
///     id: 1,
///     remote_identities: vec![RemoteIdentity::default()],
///     ..Default::default()
/// };
/// assert!(user.sanitized().remote_identities.is_empty());
/// ```
pub trait Sanitize {
    /// Strip in place.
    fn sanitize(&mut self);

    /// Strip and return.
    fn sanitized(mut self) -> Self
    where
        Self: Sized,
    {
        self.sanitize();
        self
    }
}

impl Sanitize for User {
    fn sanitize(&mut self) {
        self.remote_identities = Vec::new();
    }
}

impl Sanitize for Group {
    fn sanitize(&mut self) {
        self.users.sanitize();
    }
}

impl<T: Sanitize> Sanitize for Vec<T> {
    fn sanitize(&mut self) {
        for item in self.iter_mut() {
            item.sanitize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RemoteIdentity;
    use proptest::prelude::*;

    fn arb_identity() -> impl Strategy<Value = RemoteIdentity> {
        (
            any::<u64>(),
            prop::sample::select(vec!["github", "gitlab", "fake"]),
            any::<u64>(),
            "[a-z0-9_]{1,40}",
        )
            .prop_map(|(id, provider, remote_id, token)| RemoteIdentity {
                id,
                provider: provider.to_string(),
                remote_id,
                access_token: token,
                user_id: 1,
            })
    }

    fn arb_user() -> impl Strategy<Value = User> {
        (
            1u64..1000,
            "[A-Za-z ]{0,20}",
            prop::collection::vec(arb_identity(), 0..5),
        )
            .prop_map(|(id, name, remote_identities)| User {
                id,
                name,
                remote_identities,
                ..Default::default()
            })
    }

    fn arb_group() -> impl Strategy<Value = Group> {
        (1u64..100, prop::collection::vec(arb_user(), 0..5)).prop_map(|(id, users)| Group {
            id,
            course_id: 1,
            users,
        })
    }

    fn no_identities(users: &[User]) -> bool {
        users.iter().all(|u| u.remote_identities.is_empty())
    }

    proptest! {
        #[test]
        fn user_is_stripped(user in arb_user()) {
            let name = user.name.clone();
            let user = user.sanitized();
            prop_assert!(user.remote_identities.is_empty());
            prop_assert_eq!(user.name, name);
        }

        #[test]
        fn users_are_stripped(users in prop::collection::vec(arb_user(), 0..8)) {
            let len = users.len();
            let users = users.sanitized();
            prop_assert_eq!(users.len(), len);
            prop_assert!(no_identities(&users));
        }

        #[test]
        fn group_is_stripped(group in arb_group()) {
            let group = group.sanitized();
            prop_assert!(no_identities(&group.users));
        }

        #[test]
        fn groups_are_stripped(groups in prop::collection::vec(arb_group(), 0..5)) {
            let groups = groups.sanitized();
            prop_assert!(groups.iter().all(|g| no_identities(&g.users)));

            let json = serde_json::to_value(&groups).unwrap();
            for group in json.as_array().unwrap() {
                for user in group["users"].as_array().unwrap() {
                    prop_assert_eq!(&user["remote_identities"], &serde_json::json!([]));
                }
            }
        }
    }
}
