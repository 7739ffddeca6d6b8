//! Community membership domain service.
//!
//! Implements the driving ports for community operations, enforcing the
//! membership invariants and translating port failures into domain errors.
//! Mutations follow a read-modify-write pattern against the community store:
//! the whole aggregate is loaded, changed in memory, and written back, with a
//! bounded retry when a concurrent writer wins the revision race.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::code_allocator::{AllocationError, CodeAllocator};
use crate::domain::ports::{
    CommunityCommand, CommunityDetail, CommunityOverview, CommunityQuery, CommunityRepository,
    CommunityRepositoryError, CommunitySearchHit, CommunityStats, CreateCommunityRequest,
    CreatedCommunity, JoinedCommunity, MemberDetail, UpdateCommunityRequest, UpdatedCommunity,
    UserDirectory, UserDirectoryError,
};
use crate::domain::{
    Community, CommunityId, CommunityName, CommunitySettings, Description, Error, InviteCode,
    MemberRole, User, UserId, UserProfile,
};

/// Retry bound for revision-guarded writes.
const SAVE_ATTEMPTS: u32 = 3;
/// The create path re-allocates once when the insert hits a code collision.
const CREATE_ATTEMPTS: u32 = 2;

/// Community membership service implementing the driving ports.
#[derive(Clone)]
pub struct CommunityService<R, D> {
    store: Arc<R>,
    directory: Arc<D>,
    allocator: CodeAllocator,
}

impl<R, D> CommunityService<R, D> {
    /// Create a new service over the given store and directory.
    pub fn new(store: Arc<R>, directory: Arc<D>) -> Self {
        Self {
            store,
            directory,
            allocator: CodeAllocator::default(),
        }
    }
}

impl<R, D> CommunityService<R, D>
where
    R: CommunityRepository,
    D: UserDirectory,
{
    fn map_store_error(error: CommunityRepositoryError) -> Error {
        match error {
            CommunityRepositoryError::Connection { message } => {
                Error::service_unavailable(format!("community store unavailable: {message}"))
            }
            CommunityRepositoryError::Query { message } => {
                Error::internal(format!("community store error: {message}"))
            }
            CommunityRepositoryError::DuplicateCode { .. } => {
                Error::conflict("Community code collision, please retry")
            }
            CommunityRepositoryError::RevisionConflict { .. } => {
                Error::conflict("The community was modified concurrently, please retry")
            }
        }
    }

    fn map_directory_error(error: UserDirectoryError) -> Error {
        match error {
            UserDirectoryError::Connection { message } => {
                Error::service_unavailable(format!("user directory unavailable: {message}"))
            }
            UserDirectoryError::Query { message } => {
                Error::internal(format!("user directory error: {message}"))
            }
        }
    }

    fn map_allocation_error(error: AllocationError) -> Error {
        match error {
            AllocationError::Exhausted => {
                Error::service_unavailable("Unable to generate unique community code")
            }
            AllocationError::Store(err) => Self::map_store_error(err),
        }
    }

    async fn resolve_caller(&self, caller: &UserId) -> Result<User, Error> {
        self.directory
            .find_by_id(caller)
            .await
            .map_err(Self::map_directory_error)?
            .ok_or_else(|| Error::not_found("User not found"))
    }

    fn require_complete_profile(user: &User, action: &str) -> Result<(), Error> {
        if user.has_complete_profile() {
            Ok(())
        } else {
            Err(Error::invalid_request(format!(
                "Please complete your profile before {action} a community"
            )))
        }
    }

    async fn load_community(&self, id: &CommunityId) -> Result<Community, Error> {
        self.store
            .find_by_id(id)
            .await
            .map_err(Self::map_store_error)?
            .ok_or_else(|| Error::not_found("Community not found"))
    }

    async fn creator_profiles(
        &self,
        communities: &[Community],
    ) -> Result<HashMap<UserId, UserProfile>, Error> {
        let creator_ids: Vec<UserId> = communities.iter().map(|c| c.created_by).collect();
        self.directory
            .find_profiles(&creator_ids)
            .await
            .map_err(Self::map_directory_error)
    }

    fn creator_profile<'a>(
        profiles: &'a HashMap<UserId, UserProfile>,
        community: &Community,
    ) -> Result<&'a UserProfile, Error> {
        profiles.get(&community.created_by).ok_or_else(|| {
            Error::internal(format!(
                "creator {} of community {} missing from directory",
                community.created_by, community.id
            ))
        })
    }

    /// Load, mutate, and write back a community, retrying lost revision races.
    async fn mutate<T>(
        &self,
        id: &CommunityId,
        apply: impl Fn(&mut Community) -> Result<T, Error>,
    ) -> Result<T, Error> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut community = self.load_community(id).await?;
            let outcome = apply(&mut community)?;
            match self.store.save(&community).await {
                Ok(()) => return Ok(outcome),
                Err(CommunityRepositoryError::RevisionConflict { .. })
                    if attempt < SAVE_ATTEMPTS =>
                {
                    warn!(community = %id, attempt, "revision race on save, retrying");
                }
                Err(err) => return Err(Self::map_store_error(err)),
            }
        }
    }
}

#[async_trait]
impl<R, D> CommunityCommand for CommunityService<R, D>
where
    R: CommunityRepository,
    D: UserDirectory,
{
    async fn create(
        &self,
        caller: &UserId,
        request: CreateCommunityRequest,
    ) -> Result<CreatedCommunity, Error> {
        let name = CommunityName::new(&request.name)?;
        let description = Description::new(request.description.as_deref().unwrap_or(""))?;
        let settings = CommunitySettings::from_patch(&request.settings.unwrap_or_default());

        let creator = self.resolve_caller(caller).await?;
        Self::require_complete_profile(&creator, "creating")?;

        let mut attempt = 0;
        let community = loop {
            attempt += 1;
            let code = self
                .allocator
                .allocate(self.store.as_ref())
                .await
                .map_err(Self::map_allocation_error)?;
            let candidate = Community::create(
                name.clone(),
                description.clone(),
                code,
                *caller,
                settings,
            );
            match self.store.insert(&candidate).await {
                Ok(()) => break candidate,
                Err(CommunityRepositoryError::DuplicateCode { code })
                    if attempt < CREATE_ATTEMPTS =>
                {
                    // The pre-check raced another insert; draw a fresh code.
                    warn!(code, "invite code collided at insert, reallocating");
                }
                Err(err) => return Err(Self::map_store_error(err)),
            }
        };

        info!(community = %community.id, code = %community.code, creator = %caller, "community created");
        Ok(CreatedCommunity {
            id: community.id,
            name: community.name,
            description: community.description,
            code: community.code,
            member_count: 1,
            is_admin: true,
            created_by: creator.public_profile(),
            created_at: community.created_at,
        })
    }

    async fn join(&self, caller: &UserId, code: &str) -> Result<JoinedCommunity, Error> {
        let code = InviteCode::new(code)?;
        let joiner = self.resolve_caller(caller).await?;
        Self::require_complete_profile(&joiner, "joining")?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut community = self
                .store
                .find_by_code(&code)
                .await
                .map_err(Self::map_store_error)?
                .ok_or_else(|| {
                    Error::not_found("Community not found. Please check the code and try again.")
                })?;
            community.add_member(*caller, MemberRole::Member)?;
            match self.store.save(&community).await {
                Ok(()) => {
                    info!(community = %community.id, user = %caller, "member joined");
                    return Ok(JoinedCommunity {
                        id: community.id,
                        name: community.name,
                        description: community.description,
                        code: community.code,
                        member_count: community.members.len(),
                        is_admin: false,
                    });
                }
                Err(CommunityRepositoryError::RevisionConflict { .. })
                    if attempt < SAVE_ATTEMPTS =>
                {
                    warn!(community = %community.id, attempt, "revision race on join, retrying");
                }
                Err(err) => return Err(Self::map_store_error(err)),
            }
        }
    }

    async fn update(
        &self,
        caller: &UserId,
        id: &CommunityId,
        request: UpdateCommunityRequest,
    ) -> Result<UpdatedCommunity, Error> {
        self.mutate(id, move |community| {
            if !community.is_admin(caller) {
                return Err(Error::forbidden(
                    "Access denied. Only community admins can update settings.",
                ));
            }
            // Field validation runs after the load and admin checks so a bad
            // payload cannot shadow a not-found or forbidden outcome.
            let name = request.name.as_deref().map(CommunityName::new).transpose()?;
            let description = request
                .description
                .as_deref()
                .map(Description::new)
                .transpose()?;
            if let Some(name) = name {
                community.name = name;
            }
            if let Some(description) = description {
                community.description = description;
            }
            if let Some(patch) = &request.settings {
                community.settings.apply_patch(patch);
            }
            community.touch(chrono::Utc::now());
            Ok(UpdatedCommunity {
                id: community.id,
                name: community.name.clone(),
                description: community.description.clone(),
                settings: community.settings,
                updated_at: community.updated_at,
            })
        })
        .await
    }

    async fn leave(&self, caller: &UserId, id: &CommunityId) -> Result<CommunityName, Error> {
        self.mutate(id, |community| {
            if community.is_creator(caller) {
                return Err(Error::forbidden(
                    "Community creator cannot leave. Delete the community instead.",
                ));
            }
            if !community.is_member(caller) {
                return Err(Error::conflict("You are not a member of this community"));
            }
            community.remove_member(caller)?;
            Ok(community.name.clone())
        })
        .await
    }

    async fn delete(&self, caller: &UserId, id: &CommunityId) -> Result<CommunityName, Error> {
        let community = self.load_community(id).await?;
        if !community.is_creator(caller) {
            return Err(Error::forbidden(
                "Access denied. Only the community creator can delete it.",
            ));
        }
        self.store
            .delete(id)
            .await
            .map_err(Self::map_store_error)?;
        info!(community = %id, creator = %caller, "community deleted");
        Ok(community.name)
    }

    async fn promote_member(
        &self,
        caller: &UserId,
        id: &CommunityId,
        target: &UserId,
    ) -> Result<(), Error> {
        self.mutate(id, |community| {
            if !community.is_admin(caller) {
                return Err(Error::forbidden("Only admins can promote members"));
            }
            community.set_member_role(target, MemberRole::Admin)?;
            Ok(())
        })
        .await
    }

    async fn demote_member(
        &self,
        caller: &UserId,
        id: &CommunityId,
        target: &UserId,
    ) -> Result<(), Error> {
        self.mutate(id, |community| {
            if !community.is_creator(caller) {
                return Err(Error::forbidden(
                    "Only the community creator can demote admins",
                ));
            }
            if target == caller {
                return Err(Error::invalid_request("Cannot demote the community creator"));
            }
            community.set_member_role(target, MemberRole::Member)?;
            Ok(())
        })
        .await
    }

    async fn remove_member(
        &self,
        caller: &UserId,
        id: &CommunityId,
        target: &UserId,
    ) -> Result<(), Error> {
        self.mutate(id, |community| {
            if !community.is_admin(caller) {
                return Err(Error::forbidden("Only admins can remove members"));
            }
            community.remove_member(target)?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl<R, D> CommunityQuery for CommunityService<R, D>
where
    R: CommunityRepository,
    D: UserDirectory,
{
    async fn joined(&self, caller: &UserId) -> Result<Vec<CommunityOverview>, Error> {
        let communities = self
            .store
            .find_by_member(caller)
            .await
            .map_err(Self::map_store_error)?;
        let profiles = self.creator_profiles(&communities).await?;

        let mut overviews = Vec::with_capacity(communities.len());
        for community in &communities {
            let Some(membership) = community.member(caller) else {
                // `find_by_member` and a concurrent removal can disagree here.
                warn!(community = %community.id, user = %caller, "membership vanished during listing");
                continue;
            };
            let created_by = Self::creator_profile(&profiles, community)?.clone();
            overviews.push(CommunityOverview {
                id: community.id,
                name: community.name.clone(),
                description: community.description.clone(),
                code: community.code.clone(),
                member_count: community.member_count(),
                is_admin: community.is_admin(caller),
                is_creator: community.is_creator(caller),
                created_by,
                joined_at: membership.joined_at,
                created_at: community.created_at,
                last_activity: community.last_activity,
            });
        }
        Ok(overviews)
    }

    async fn by_id(&self, caller: &UserId, id: &CommunityId) -> Result<CommunityDetail, Error> {
        let community = self.load_community(id).await?;
        // Membership is the sole visibility gate; `is_public` does not bypass it.
        if !community.is_member(caller) {
            return Err(Error::forbidden(
                "Access denied. You are not a member of this community.",
            ));
        }

        let member_ids: Vec<UserId> = community.members.iter().map(|m| m.user).collect();
        let profiles = self
            .directory
            .find_profiles(&member_ids)
            .await
            .map_err(Self::map_directory_error)?;

        let members = community
            .members
            .iter()
            .filter_map(|membership| {
                let Some(profile) = profiles.get(&membership.user) else {
                    warn!(user = %membership.user, community = %community.id, "member profile missing from directory");
                    return None;
                };
                Some(MemberDetail {
                    profile: profile.clone(),
                    role: membership.role,
                    joined_at: membership.joined_at,
                })
            })
            .collect();
        let created_by = Self::creator_profile(&profiles, &community)?.clone();

        Ok(CommunityDetail {
            id: community.id,
            name: community.name.clone(),
            description: community.description.clone(),
            code: community.code.clone(),
            created_by,
            members,
            member_count: community.member_count(),
            is_admin: community.is_admin(caller),
            is_creator: community.is_creator(caller),
            settings: community.settings,
            is_active: community.is_active,
            created_at: community.created_at,
            updated_at: community.updated_at,
            last_activity: community.last_activity,
        })
    }

    async fn search(
        &self,
        caller: &UserId,
        query: &str,
    ) -> Result<Vec<CommunitySearchHit>, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::invalid_request("Search query is required"));
        }

        let communities = self
            .store
            .search(caller, query)
            .await
            .map_err(Self::map_store_error)?;
        let profiles = self.creator_profiles(&communities).await?;

        communities
            .iter()
            .map(|community| {
                let created_by = Self::creator_profile(&profiles, community)?.clone();
                Ok(CommunitySearchHit {
                    id: community.id,
                    name: community.name.clone(),
                    description: community.description.clone(),
                    code: community.code.clone(),
                    member_count: community.member_count(),
                    is_admin: community.is_admin(caller),
                    created_by,
                })
            })
            .collect()
    }

    async fn platform_stats(&self) -> Result<CommunityStats, Error> {
        self.store.stats().await.map_err(Self::map_store_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{MockCommunityRepository, MockUserDirectory};
    use crate::domain::{Email, ErrorCode, SettingsPatch, Username};

    fn directory_user(id: UserId) -> User {
        User::new(
            id,
            Username::new("ada.l").expect("valid username"),
            Email::new("ada@example.com").expect("valid email"),
            "Ada Lovelace",
        )
    }

    fn community_fixture(creator: UserId) -> Community {
        Community::create(
            CommunityName::new("Herb Growers").expect("valid name"),
            Description::default(),
            InviteCode::new("4321").expect("valid code"),
            creator,
            CommunitySettings::default(),
        )
    }

    fn service(
        store: MockCommunityRepository,
        directory: MockUserDirectory,
    ) -> CommunityService<MockCommunityRepository, MockUserDirectory> {
        CommunityService::new(Arc::new(store), Arc::new(directory))
    }

    fn expect_caller(directory: &mut MockUserDirectory, user: User) {
        directory
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
    }

    #[tokio::test]
    async fn create_allocates_a_code_and_seats_the_creator() {
        let caller = UserId::random();
        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store.expect_code_exists().times(1).returning(|_| Ok(false));
        store.expect_insert().times(1).returning(|_| Ok(()));

        let created = service(store, directory)
            .create(
                &caller,
                CreateCommunityRequest {
                    name: "Herb Growers".into(),
                    description: Some("Rooftop herbs".into()),
                    settings: None,
                },
            )
            .await
            .expect("create succeeds");

        assert!(created.is_admin);
        assert_eq!(created.member_count, 1);
        assert_eq!(created.code.as_ref().len(), 4);
        assert!(created.code.as_ref().bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(created.created_by.id, caller);
    }

    #[tokio::test]
    async fn create_reallocates_once_on_insert_collision() {
        let caller = UserId::random();
        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store.expect_code_exists().times(2).returning(|_| Ok(false));
        let mut first = true;
        store.expect_insert().times(2).returning(move |candidate| {
            if std::mem::take(&mut first) {
                Err(CommunityRepositoryError::DuplicateCode {
                    code: candidate.code.as_ref().to_owned(),
                })
            } else {
                Ok(())
            }
        });

        service(store, directory)
            .create(
                &caller,
                CreateCommunityRequest {
                    name: "Herb Growers".into(),
                    ..CreateCommunityRequest::default()
                },
            )
            .await
            .expect("second insert succeeds");
    }

    #[tokio::test]
    async fn create_surfaces_conflict_after_repeated_collisions() {
        let caller = UserId::random();
        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store.expect_code_exists().times(2).returning(|_| Ok(false));
        store.expect_insert().times(2).returning(|candidate| {
            Err(CommunityRepositoryError::DuplicateCode {
                code: candidate.code.as_ref().to_owned(),
            })
        });

        let err = service(store, directory)
            .create(
                &caller,
                CreateCommunityRequest {
                    name: "Herb Growers".into(),
                    ..CreateCommunityRequest::default()
                },
            )
            .await
            .expect_err("both inserts collide");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn create_rejects_short_names_before_any_lookup() {
        // No expectations configured: any store or directory call would panic.
        let err = service(MockCommunityRepository::new(), MockUserDirectory::new())
            .create(
                &UserId::random(),
                CreateCommunityRequest {
                    name: "ab".into(),
                    ..CreateCommunityRequest::default()
                },
            )
            .await
            .expect_err("name too short");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn create_applies_and_clamps_settings_overrides() {
        let caller = UserId::random();
        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store.expect_code_exists().returning(|_| Ok(false));
        store
            .expect_insert()
            .withf(|candidate| {
                candidate.settings.is_public && candidate.settings.max_members == 1000
            })
            .times(1)
            .returning(|_| Ok(()));

        service(store, directory)
            .create(
                &caller,
                CreateCommunityRequest {
                    name: "Herb Growers".into(),
                    description: None,
                    settings: Some(SettingsPatch {
                        is_public: Some(true),
                        max_members: Some(99_999),
                        ..SettingsPatch::default()
                    }),
                },
            )
            .await
            .expect("create succeeds");
    }

    #[tokio::test]
    async fn join_rejects_malformed_codes_without_store_lookup() {
        let err = service(MockCommunityRepository::new(), MockUserDirectory::new())
            .join(&UserId::random(), "12")
            .await
            .expect_err("two digits are not a code");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn join_twice_is_a_conflict() {
        let caller = UserId::random();
        let mut community = community_fixture(UserId::random());
        community
            .add_member(caller, MemberRole::Member)
            .expect("seed membership");

        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store
            .expect_find_by_code()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, directory)
            .join(&caller, "4321")
            .await
            .expect_err("already a member");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn join_is_rejected_when_the_community_is_full() {
        let caller = UserId::random();
        let mut community = community_fixture(UserId::random());
        community.settings.max_members = 2;
        community
            .add_member(UserId::random(), MemberRole::Member)
            .expect("fill last seat");

        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store
            .expect_find_by_code()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, directory)
            .join(&caller, "4321")
            .await
            .expect_err("community full");
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[tokio::test]
    async fn join_retries_after_losing_a_revision_race() {
        let caller = UserId::random();
        let community = community_fixture(UserId::random());

        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store
            .expect_find_by_code()
            .times(2)
            .returning(move |_| Ok(Some(community.clone())));
        let mut lost_race = true;
        store.expect_save().times(2).returning(move |_| {
            if std::mem::take(&mut lost_race) {
                Err(CommunityRepositoryError::RevisionConflict { actual: 2 })
            } else {
                Ok(())
            }
        });

        let joined = service(store, directory)
            .join(&caller, "4321")
            .await
            .expect("retry succeeds");
        assert!(!joined.is_admin);
        assert_eq!(joined.member_count, 2);
    }

    #[tokio::test]
    async fn join_with_unknown_code_is_not_found() {
        let caller = UserId::random();
        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store.expect_find_by_code().returning(|_| Ok(None));

        let err = service(store, directory)
            .join(&caller, "9999")
            .await
            .expect_err("no such community");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn detail_is_forbidden_for_non_members_even_when_public() {
        let caller = UserId::random();
        let mut community = community_fixture(UserId::random());
        community.settings.is_public = true;

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .by_id(&caller, &CommunityId::random())
            .await
            .expect_err("membership is the sole gate");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn update_requires_the_community_admin_role() {
        let creator = UserId::random();
        let outsider_member = UserId::random();
        let mut community = community_fixture(creator);
        community
            .add_member(outsider_member, MemberRole::Member)
            .expect("seed membership");

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .update(
                &outsider_member,
                &CommunityId::random(),
                UpdateCommunityRequest {
                    name: Some("New Name".into()),
                    ..UpdateCommunityRequest::default()
                },
            )
            .await
            .expect_err("plain members cannot update");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn update_reports_lookup_and_role_failures_before_bad_fields() {
        let bad_name = UpdateCommunityRequest {
            name: Some("ab".into()),
            ..UpdateCommunityRequest::default()
        };

        let mut store = MockCommunityRepository::new();
        store.expect_find_by_id().returning(|_| Ok(None));
        let err = service(store, MockUserDirectory::new())
            .update(&UserId::random(), &CommunityId::random(), bad_name.clone())
            .await
            .expect_err("absent community wins over the bad name");
        assert_eq!(err.code(), ErrorCode::NotFound);

        let creator = UserId::random();
        let member = UserId::random();
        let mut community = community_fixture(creator);
        community
            .add_member(member, MemberRole::Member)
            .expect("seed membership");
        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));
        let err = service(store, MockUserDirectory::new())
            .update(&member, &CommunityId::random(), bad_name.clone())
            .await
            .expect_err("missing admin role wins over the bad name");
        assert_eq!(err.code(), ErrorCode::Forbidden);

        let community = community_fixture(creator);
        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));
        let err = service(store, MockUserDirectory::new())
            .update(&creator, &CommunityId::random(), bad_name)
            .await
            .expect_err("the bad name still fails for an admin");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn update_patches_only_the_provided_fields() {
        let creator = UserId::random();
        let community = community_fixture(creator);
        let original_name = community.name.clone();

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));
        store
            .expect_save()
            .withf(move |saved| {
                saved.name == original_name && saved.settings.max_members == 25
            })
            .times(1)
            .returning(|_| Ok(()));

        let updated = service(store, MockUserDirectory::new())
            .update(
                &creator,
                &CommunityId::random(),
                UpdateCommunityRequest {
                    name: None,
                    description: None,
                    settings: Some(SettingsPatch {
                        max_members: Some(25),
                        ..SettingsPatch::default()
                    }),
                },
            )
            .await
            .expect("update succeeds");
        assert_eq!(updated.settings.max_members, 25);
        assert!(!updated.settings.is_public);
    }

    #[tokio::test]
    async fn the_creator_cannot_leave() {
        let creator = UserId::random();
        let community = community_fixture(creator);

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .leave(&creator, &CommunityId::random())
            .await
            .expect_err("creator must delete instead");
        assert_eq!(err.code(), ErrorCode::Forbidden);
        assert!(err.message().contains("Delete the community instead"));
    }

    #[tokio::test]
    async fn only_the_creator_may_delete() {
        let creator = UserId::random();
        let admin = UserId::random();
        let mut community = community_fixture(creator);
        community
            .add_member(admin, MemberRole::Admin)
            .expect("seed admin");

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .delete(&admin, &CommunityId::random())
            .await
            .expect_err("promoted admins cannot delete");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn demotion_is_creator_only() {
        let creator = UserId::random();
        let admin = UserId::random();
        let target = UserId::random();
        let mut community = community_fixture(creator);
        community
            .add_member(admin, MemberRole::Admin)
            .expect("seed admin");
        community
            .add_member(target, MemberRole::Admin)
            .expect("seed target");

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .demote_member(&admin, &CommunityId::random(), &target)
            .await
            .expect_err("admins cannot demote");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn the_creator_is_unremovable() {
        let creator = UserId::random();
        let admin = UserId::random();
        let mut community = community_fixture(creator);
        community
            .add_member(admin, MemberRole::Admin)
            .expect("seed admin");

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .remove_member(&admin, &CommunityId::random(), &creator)
            .await
            .expect_err("creator is protected");
        assert_eq!(err.code(), ErrorCode::Forbidden);
    }

    #[tokio::test]
    async fn promoting_an_unknown_target_is_not_found() {
        let creator = UserId::random();
        let community = community_fixture(creator);

        let mut store = MockCommunityRepository::new();
        store
            .expect_find_by_id()
            .returning(move |_| Ok(Some(community.clone())));

        let err = service(store, MockUserDirectory::new())
            .promote_member(&creator, &CommunityId::random(), &UserId::random())
            .await
            .expect_err("target never joined");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn empty_search_queries_are_rejected() {
        let err = service(MockCommunityRepository::new(), MockUserDirectory::new())
            .search(&UserId::random(), "   ")
            .await
            .expect_err("blank query");
        assert_eq!(err.code(), ErrorCode::InvalidRequest);
    }

    #[tokio::test]
    async fn store_outages_surface_as_service_unavailable() {
        let caller = UserId::random();
        let mut store = MockCommunityRepository::new();
        let mut directory = MockUserDirectory::new();
        expect_caller(&mut directory, directory_user(caller));
        store.expect_code_exists().returning(|_| {
            Err(CommunityRepositoryError::Connection {
                message: "refused".into(),
            })
        });

        let err = service(store, directory)
            .create(
                &caller,
                CreateCommunityRequest {
                    name: "Herb Growers".into(),
                    ..CreateCommunityRequest::default()
                },
            )
            .await
            .expect_err("store offline");
        assert_eq!(err.code(), ErrorCode::ServiceUnavailable);
    }
}
