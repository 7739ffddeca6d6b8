//! In-memory adapters for the community store and user directory.
//!
//! Keeps whole documents behind a `tokio::sync::RwLock`, with a secondary
//! index enforcing invite-code uniqueness and a per-document revision
//! implementing the optimistic-concurrency contract of the store port.
//! Backs the deployed service's single-process mode and the integration
//! tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::ports::{
    CommunityRepository, CommunityRepositoryError, CommunityStats, UserDirectory,
    UserDirectoryError,
};
use crate::domain::{Community, CommunityId, Email, InviteCode, User, UserId, UserProfile};

/// Hard cap applied to member-list and search queries.
const SEARCH_LIMIT: usize = 20;

#[derive(Default)]
struct StoreInner {
    communities: HashMap<CommunityId, Community>,
    codes: HashMap<InviteCode, CommunityId>,
}

/// In-memory community store with code uniqueness and revision checks.
#[derive(Default)]
pub struct InMemoryCommunityStore {
    inner: RwLock<StoreInner>,
}

impl InMemoryCommunityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn newest_first(communities: &mut [Community]) {
    communities.sort_by(|a, b| b.last_activity.cmp(&a.last_activity));
}

#[async_trait]
impl CommunityRepository for InMemoryCommunityStore {
    async fn insert(&self, community: &Community) -> Result<(), CommunityRepositoryError> {
        let mut inner = self.inner.write().await;
        if inner.codes.contains_key(&community.code) {
            return Err(CommunityRepositoryError::DuplicateCode {
                code: community.code.as_ref().to_owned(),
            });
        }
        let mut stored = community.clone();
        stored.revision = 1;
        inner.codes.insert(stored.code.clone(), stored.id);
        inner.communities.insert(stored.id, stored);
        Ok(())
    }

    async fn find_by_id(
        &self,
        id: &CommunityId,
    ) -> Result<Option<Community>, CommunityRepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.communities.get(id).cloned())
    }

    async fn find_by_member(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Community>, CommunityRepositoryError> {
        let inner = self.inner.read().await;
        let mut matches: Vec<Community> = inner
            .communities
            .values()
            .filter(|c| c.is_active && c.is_member(user_id))
            .cloned()
            .collect();
        newest_first(&mut matches);
        Ok(matches)
    }

    async fn find_by_code(
        &self,
        code: &InviteCode,
    ) -> Result<Option<Community>, CommunityRepositoryError> {
        let inner = self.inner.read().await;
        let community = inner
            .codes
            .get(code)
            .and_then(|id| inner.communities.get(id))
            .filter(|c| c.is_active)
            .cloned();
        Ok(community)
    }

    async fn code_exists(&self, code: &InviteCode) -> Result<bool, CommunityRepositoryError> {
        let inner = self.inner.read().await;
        Ok(inner.codes.contains_key(code))
    }

    async fn search(
        &self,
        user_id: &UserId,
        query: &str,
    ) -> Result<Vec<Community>, CommunityRepositoryError> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        let mut matches: Vec<Community> = inner
            .communities
            .values()
            .filter(|c| {
                c.is_active
                    && c.is_member(user_id)
                    && c.name.as_ref().to_lowercase().contains(&needle)
            })
            .cloned()
            .collect();
        newest_first(&mut matches);
        matches.truncate(SEARCH_LIMIT);
        Ok(matches)
    }

    async fn save(&self, community: &Community) -> Result<(), CommunityRepositoryError> {
        let mut inner = self.inner.write().await;
        let Some(existing) = inner.communities.get(&community.id) else {
            return Err(CommunityRepositoryError::Query {
                message: format!("community {} does not exist", community.id),
            });
        };
        if existing.revision != community.revision {
            return Err(CommunityRepositoryError::RevisionConflict {
                actual: existing.revision,
            });
        }
        let mut stored = community.clone();
        stored.revision += 1;
        inner.communities.insert(stored.id, stored);
        Ok(())
    }

    async fn delete(&self, id: &CommunityId) -> Result<(), CommunityRepositoryError> {
        let mut inner = self.inner.write().await;
        if let Some(removed) = inner.communities.remove(id) {
            inner.codes.remove(&removed.code);
        }
        Ok(())
    }

    async fn stats(&self) -> Result<CommunityStats, CommunityRepositoryError> {
        let inner = self.inner.read().await;
        let total_communities = inner.communities.len() as u64;
        let active: Vec<&Community> = inner
            .communities
            .values()
            .filter(|c| c.is_active)
            .collect();
        let active_communities = active.len() as u64;
        let total_members: u64 = active.iter().map(|c| c.member_count() as u64).sum();
        let average_members = if active_communities == 0 {
            0
        } else {
            // Integer rounding to the nearest whole member.
            (total_members + active_communities / 2) / active_communities
        };
        Ok(CommunityStats {
            total_communities,
            active_communities,
            total_members,
            average_members,
        })
    }
}

/// In-memory user directory.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed or replace a directory record.
    pub async fn upsert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, UserDirectoryError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<User>, UserDirectoryError> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == *email).cloned())
    }

    async fn find_profiles(
        &self,
        ids: &[UserId],
    ) -> Result<HashMap<UserId, UserProfile>, UserDirectoryError> {
        let users = self.users.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| users.get(id).map(|u| (*id, u.public_profile())))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        CommunityName, CommunitySettings, Description, Email, MemberRole, Username,
    };

    fn sample_community(code: &str, creator: UserId) -> Community {
        Community::create(
            CommunityName::new("Herb Growers").expect("valid name"),
            Description::default(),
            InviteCode::new(code).expect("valid code"),
            creator,
            CommunitySettings::default(),
        )
    }

    #[tokio::test]
    async fn insert_enforces_code_uniqueness() {
        let store = InMemoryCommunityStore::new();
        store
            .insert(&sample_community("1234", UserId::random()))
            .await
            .expect("first insert succeeds");

        let err = store
            .insert(&sample_community("1234", UserId::random()))
            .await
            .expect_err("code already assigned");
        assert!(matches!(
            err,
            CommunityRepositoryError::DuplicateCode { code } if code == "1234"
        ));
    }

    #[tokio::test]
    async fn save_checks_and_bumps_the_revision() {
        let store = InMemoryCommunityStore::new();
        let creator = UserId::random();
        let community = sample_community("1234", creator);
        store.insert(&community).await.expect("insert succeeds");

        let mut loaded = store
            .find_by_id(&community.id)
            .await
            .expect("lookup succeeds")
            .expect("community stored");
        assert_eq!(loaded.revision, 1);

        loaded
            .add_member(UserId::random(), MemberRole::Member)
            .expect("join succeeds");
        store.save(&loaded).await.expect("first save wins");

        // The same in-memory copy now carries a stale revision.
        let err = store.save(&loaded).await.expect_err("stale revision");
        assert!(matches!(
            err,
            CommunityRepositoryError::RevisionConflict { actual: 2 }
        ));
    }

    #[tokio::test]
    async fn member_listing_is_active_only_and_newest_first() {
        let store = InMemoryCommunityStore::new();
        let member = UserId::random();

        let mut older = sample_community("1111", member);
        older.last_activity = chrono::Utc::now() - chrono::Duration::hours(2);
        let newer = sample_community("2222", member);
        let mut inactive = sample_community("3333", member);
        inactive.is_active = false;

        for community in [&older, &newer, &inactive] {
            store.insert(community).await.expect("insert succeeds");
        }

        let listed = store
            .find_by_member(&member)
            .await
            .expect("listing succeeds");
        let ids: Vec<CommunityId> = listed.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[tokio::test]
    async fn inactive_communities_hold_their_code_but_reject_joins() {
        let store = InMemoryCommunityStore::new();
        let mut community = sample_community("5678", UserId::random());
        community.is_active = false;
        store.insert(&community).await.expect("insert succeeds");

        assert!(store
            .code_exists(&community.code)
            .await
            .expect("check succeeds"));
        assert!(store
            .find_by_code(&community.code)
            .await
            .expect("lookup succeeds")
            .is_none());
    }

    #[tokio::test]
    async fn delete_releases_the_code() {
        let store = InMemoryCommunityStore::new();
        let community = sample_community("4242", UserId::random());
        store.insert(&community).await.expect("insert succeeds");

        store.delete(&community.id).await.expect("delete succeeds");
        assert!(!store
            .code_exists(&community.code)
            .await
            .expect("check succeeds"));
    }

    #[tokio::test]
    async fn stats_average_over_active_communities_only() {
        let store = InMemoryCommunityStore::new();
        let mut one = sample_community("1111", UserId::random());
        one.add_member(UserId::random(), MemberRole::Member)
            .expect("join succeeds");
        one.add_member(UserId::random(), MemberRole::Member)
            .expect("join succeeds");
        let two = sample_community("2222", UserId::random());
        let mut inactive = sample_community("3333", UserId::random());
        inactive.is_active = false;

        for community in [&one, &two, &inactive] {
            store.insert(community).await.expect("insert succeeds");
        }

        let stats = store.stats().await.expect("stats succeed");
        assert_eq!(stats.total_communities, 3);
        assert_eq!(stats.active_communities, 2);
        assert_eq!(stats.total_members, 4);
        assert_eq!(stats.average_members, 2);
    }

    #[tokio::test]
    async fn directory_lookups_by_id_and_email() {
        let directory = InMemoryUserDirectory::new();
        let user = User::new(
            UserId::random(),
            Username::new("ida.r").expect("valid username"),
            Email::new("Ida@Example.com").expect("valid email"),
            "Ida Rhodes",
        );
        directory.upsert(user.clone()).await;

        let by_id = directory
            .find_by_id(&user.id)
            .await
            .expect("lookup succeeds")
            .expect("present");
        assert_eq!(by_id.id, user.id);

        let email = Email::new("ida@example.com").expect("valid email");
        let by_email = directory
            .find_by_email(&email)
            .await
            .expect("lookup succeeds")
            .expect("normalised emails match");
        assert_eq!(by_email.id, user.id);

        let profiles = directory
            .find_profiles(&[user.id, UserId::random()])
            .await
            .expect("lookup succeeds");
        assert_eq!(profiles.len(), 1);
    }
}
