use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, query, query_as, Error as SqlxError, FromRow, PgPool};

use crate::{
    Database, DatabaseError, IntoDatabaseError, JoinRequestData, JoinRequestStatus, NewJoinRequest,
    NewParty, NewPartyMember, NewPartyMessage, PartyData, PartyMemberData, PartyMessageData,
    PartyVisibility, PrimaryKey, Result, SessionData, UserData,
};

/// A postgres database implementation for watchparty
pub struct PgDatabase {
    pool: PgPool,
}

#[derive(FromRow)]
struct UserRow {
    id: PrimaryKey,
    username: String,
    display_name: String,
}

#[derive(FromRow)]
struct SessionRow {
    id: PrimaryKey,
    token: String,
    expires_at: DateTime<Utc>,
    user_id: PrimaryKey,
    username: String,
    display_name: String,
}

#[derive(FromRow)]
struct PartyRow {
    id: PrimaryKey,
    name: String,
    visibility: String,
    video_url: String,
    video_id: String,
    admin_id: PrimaryKey,
    is_active: bool,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct MemberRow {
    id: PrimaryKey,
    user_id: PrimaryKey,
    username: String,
    display_name: String,
}

#[derive(FromRow)]
struct JoinRequestRow {
    id: PrimaryKey,
    party_id: PrimaryKey,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_id: PrimaryKey,
    username: String,
    display_name: String,
}

#[derive(FromRow)]
struct MessageRow {
    id: PrimaryKey,
    party_id: PrimaryKey,
    content: String,
    created_at: DateTime<Utc>,
    user_id: PrimaryKey,
    username: String,
    display_name: String,
}

impl PgDatabase {
    pub async fn new(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| DatabaseError::Internal(Box::new(e)))?;

        Ok(Self { pool })
    }

    async fn party_members(&self, party_id: PrimaryKey) -> Result<Vec<PartyMemberData>> {
        let member_rows: Vec<MemberRow> = query_as(
            "
            SELECT
                party_members.id,
                party_members.user_id,
                users.username,
                users.display_name
            FROM party_members
                INNER JOIN users ON party_members.user_id = users.id
            WHERE party_id = $1
            ORDER BY party_members.id",
        )
        .bind(party_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(member_rows.into_iter().map(Into::into).collect())
    }

    fn assemble_party(&self, row: PartyRow, members: Vec<PartyMemberData>) -> Result<PartyData> {
        let visibility = PartyVisibility::parse(&row.visibility).ok_or_else(|| {
            DatabaseError::Internal(format!("unrecognized visibility {:?}", row.visibility).into())
        })?;

        Ok(PartyData {
            id: row.id,
            name: row.name,
            visibility,
            video_url: row.video_url,
            video_id: row.video_id,
            admin_id: row.admin_id,
            is_active: row.is_active,
            created_at: row.created_at,
            members,
        })
    }
}

#[async_trait]
impl Database for PgDatabase {
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData> {
        let row: UserRow = query_as("SELECT id, username, display_name FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("user", "id"))?;

        Ok(row.into())
    }

    async fn session_by_token(&self, token: &str) -> Result<SessionData> {
        let row: SessionRow = query_as(
            "
            SELECT
                sessions.id,
                sessions.token,
                sessions.expires_at,
                sessions.user_id,
                users.username,
                users.display_name
            FROM sessions
                INNER JOIN users ON sessions.user_id = users.id
            WHERE token = $1",
        )
        .bind(token)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("session", "token"))?;

        Ok(SessionData {
            id: row.id,
            token: row.token,
            expires_at: row.expires_at,
            user: UserData {
                id: row.user_id,
                username: row.username,
                display_name: row.display_name,
            },
        })
    }

    async fn party_by_id(&self, party_id: PrimaryKey) -> Result<PartyData> {
        let row: PartyRow = query_as("SELECT * FROM parties WHERE id = $1")
            .bind(party_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| e.not_found_or("party", "id"))?;

        let members = self.party_members(party_id).await?;
        self.assemble_party(row, members)
    }

    async fn list_parties(&self) -> Result<Vec<PartyData>> {
        let rows: Vec<PartyRow> = query_as("SELECT * FROM parties ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| e.any())?;

        let mut parties = Vec::with_capacity(rows.len());

        for row in rows {
            let members = self.party_members(row.id).await?;
            parties.push(self.assemble_party(row, members)?);
        }

        Ok(parties)
    }

    async fn create_party(&self, new_party: NewParty) -> Result<PartyData> {
        let user = self.user_by_id(new_party.user_id).await?;

        let row: PartyRow = query_as(
            "
            INSERT INTO parties (name, visibility, video_url, video_id, admin_id, is_active)
            VALUES ($1, $2, $3, $4, $5, true)
            RETURNING *",
        )
        .bind(&new_party.name)
        .bind(new_party.visibility.as_str())
        .bind(&new_party.video_url)
        .bind(&new_party.video_id)
        .bind(user.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        // The admin is always a member, starting with the creator
        self.create_party_member(NewPartyMember {
            party_id: row.id,
            user_id: user.id,
        })
        .await?;

        self.party_by_id(row.id).await
    }

    async fn set_party_admin(&self, party_id: PrimaryKey, user_id: PrimaryKey) -> Result<()> {
        query("UPDATE parties SET admin_id = $1 WHERE id = $2")
            .bind(user_id)
            .bind(party_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn set_party_active(&self, party_id: PrimaryKey, is_active: bool) -> Result<()> {
        query("UPDATE parties SET is_active = $1 WHERE id = $2")
            .bind(is_active)
            .bind(party_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn delete_party(&self, party_id: PrimaryKey) -> Result<()> {
        // Ensure the party exists
        let _ = self.party_by_id(party_id).await?;

        query("DELETE FROM party_members WHERE party_id = $1")
            .bind(party_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        query("DELETE FROM parties WHERE id = $1")
            .bind(party_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn create_party_member(&self, new_member: NewPartyMember) -> Result<PartyMemberData> {
        // Ensure the user isn't a member of this party already
        let existing: Option<(PrimaryKey,)> =
            query_as("SELECT id FROM party_members WHERE party_id = $1 AND user_id = $2")
                .bind(new_member.party_id)
                .bind(new_member.user_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| e.any())?;

        if existing.is_some() {
            return Err(DatabaseError::Conflict {
                resource: "party member",
                field: "party:user",
                value: format!("{}:{}", new_member.party_id, new_member.user_id),
            });
        }

        let user = self.user_by_id(new_member.user_id).await?;

        let row: (PrimaryKey,) = query_as(
            "INSERT INTO party_members (party_id, user_id) VALUES ($1, $2) RETURNING id",
        )
        .bind(new_member.party_id)
        .bind(new_member.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(PartyMemberData { id: row.0, user })
    }

    async fn delete_party_member(&self, party_id: PrimaryKey, user_id: PrimaryKey) -> Result<()> {
        let member: (PrimaryKey,) =
            query_as("SELECT id FROM party_members WHERE party_id = $1 AND user_id = $2")
                .bind(party_id)
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| e.not_found_or("party member", "party_id:user_id"))?;

        query("DELETE FROM party_members WHERE id = $1")
            .bind(member.0)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn join_request_by_id(&self, request_id: PrimaryKey) -> Result<JoinRequestData> {
        let row: JoinRequestRow = query_as(
            "
            SELECT
                requests.id,
                requests.party_id,
                requests.status,
                requests.created_at,
                requests.updated_at,
                requests.user_id,
                users.username,
                users.display_name
            FROM party_join_requests AS requests
                INNER JOIN users ON requests.user_id = users.id
            WHERE requests.id = $1",
        )
        .bind(request_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("join request", "id"))?;

        row.try_into()
    }

    async fn pending_join_request(
        &self,
        party_id: PrimaryKey,
        user_id: PrimaryKey,
    ) -> Result<JoinRequestData> {
        let row: JoinRequestRow = query_as(
            "
            SELECT
                requests.id,
                requests.party_id,
                requests.status,
                requests.created_at,
                requests.updated_at,
                requests.user_id,
                users.username,
                users.display_name
            FROM party_join_requests AS requests
                INNER JOIN users ON requests.user_id = users.id
            WHERE requests.party_id = $1
                AND requests.user_id = $2
                AND requests.status = 'pending'
            ORDER BY requests.id
            LIMIT 1",
        )
        .bind(party_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.not_found_or("join request", "party_id:user_id"))?;

        row.try_into()
    }

    async fn list_pending_join_requests(
        &self,
        party_id: PrimaryKey,
    ) -> Result<Vec<JoinRequestData>> {
        let rows: Vec<JoinRequestRow> = query_as(
            "
            SELECT
                requests.id,
                requests.party_id,
                requests.status,
                requests.created_at,
                requests.updated_at,
                requests.user_id,
                users.username,
                users.display_name
            FROM party_join_requests AS requests
                INNER JOIN users ON requests.user_id = users.id
            WHERE requests.party_id = $1 AND requests.status = 'pending'
            ORDER BY requests.id",
        )
        .bind(party_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create_join_request(&self, new_request: NewJoinRequest) -> Result<JoinRequestData> {
        let row: (PrimaryKey,) = query_as(
            "
            INSERT INTO party_join_requests (party_id, user_id, status)
            VALUES ($1, $2, 'pending')
            RETURNING id",
        )
        .bind(new_request.party_id)
        .bind(new_request.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        self.join_request_by_id(row.0).await
    }

    async fn set_join_request_status(
        &self,
        request_id: PrimaryKey,
        status: JoinRequestStatus,
    ) -> Result<JoinRequestData> {
        // Ensure the request exists
        let _ = self.join_request_by_id(request_id).await?;

        query("UPDATE party_join_requests SET status = $1, updated_at = now() WHERE id = $2")
            .bind(status.as_str())
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())?;

        self.join_request_by_id(request_id).await
    }

    async fn delete_join_requests_by_party(&self, party_id: PrimaryKey) -> Result<()> {
        query("DELETE FROM party_join_requests WHERE party_id = $1")
            .bind(party_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }

    async fn create_party_message(
        &self,
        new_message: NewPartyMessage,
    ) -> Result<PartyMessageData> {
        let user = self.user_by_id(new_message.user_id).await?;

        let row: (PrimaryKey, DateTime<Utc>) = query_as(
            "
            INSERT INTO party_messages (party_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING id, created_at",
        )
        .bind(new_message.party_id)
        .bind(new_message.user_id)
        .bind(&new_message.content)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(PartyMessageData {
            id: row.0,
            party_id: new_message.party_id,
            author: user,
            content: new_message.content,
            created_at: row.1,
        })
    }

    async fn list_party_messages(
        &self,
        party_id: PrimaryKey,
        limit: i64,
    ) -> Result<Vec<PartyMessageData>> {
        let rows: Vec<MessageRow> = query_as(
            "
            SELECT
                messages.id,
                messages.party_id,
                messages.content,
                messages.created_at,
                messages.user_id,
                users.username,
                users.display_name
            FROM party_messages AS messages
                INNER JOIN users ON messages.user_id = users.id
            WHERE messages.party_id = $1
            ORDER BY messages.created_at DESC, messages.id DESC
            LIMIT $2",
        )
        .bind(party_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| e.any())?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn delete_party_messages_by_party(&self, party_id: PrimaryKey) -> Result<()> {
        query("DELETE FROM party_messages WHERE party_id = $1")
            .bind(party_id)
            .execute(&self.pool)
            .await
            .map_err(|e| e.any())
            .map(|_| ())
    }
}

impl From<UserRow> for UserData {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            display_name: row.display_name,
        }
    }
}

impl From<MemberRow> for PartyMemberData {
    fn from(row: MemberRow) -> Self {
        Self {
            id: row.id,
            user: UserData {
                id: row.user_id,
                username: row.username,
                display_name: row.display_name,
            },
        }
    }
}

impl From<MessageRow> for PartyMessageData {
    fn from(row: MessageRow) -> Self {
        Self {
            id: row.id,
            party_id: row.party_id,
            author: UserData {
                id: row.user_id,
                username: row.username,
                display_name: row.display_name,
            },
            content: row.content,
            created_at: row.created_at,
        }
    }
}

impl TryFrom<JoinRequestRow> for JoinRequestData {
    type Error = DatabaseError;

    fn try_from(row: JoinRequestRow) -> Result<Self> {
        let status = JoinRequestStatus::parse(&row.status).ok_or_else(|| {
            DatabaseError::Internal(format!("unrecognized status {:?}", row.status).into())
        })?;

        Ok(Self {
            id: row.id,
            party_id: row.party_id,
            user: UserData {
                id: row.user_id,
                username: row.username,
                display_name: row.display_name,
            },
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl IntoDatabaseError for SqlxError {
    fn any(self) -> DatabaseError {
        DatabaseError::Internal(Box::new(self))
    }

    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError {
        match self {
            SqlxError::RowNotFound => DatabaseError::NotFound {
                resource,
                identifier,
            },
            e => Self::any(e),
        }
    }
}
