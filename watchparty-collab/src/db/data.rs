use chrono::{DateTime, Utc};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A watchparty account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub display_name: String,
}

/// Login session data for authentication.
/// Sessions are issued by the external authentication system, never by this crate.
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// Who is allowed to join a party directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartyVisibility {
    /// Anyone can join
    Public,
    /// Membership is granted by the admin, via join requests or direct adds
    Private,
}

/// A watchparty party: a shared virtual room built around one external video
#[derive(Debug, Clone)]
pub struct PartyData {
    pub id: PrimaryKey,
    pub name: String,
    pub visibility: PartyVisibility,
    /// The video reference as submitted at creation
    pub video_url: String,
    /// The resolved external video identifier
    pub video_id: String,
    /// The member with exclusive rights to manage the party
    pub admin_id: PrimaryKey,
    /// Cleared when the last member leaves. An inactive party is retained as a record.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub members: Vec<PartyMemberData>,
}

/// A member of a party
#[derive(Debug, Clone)]
pub struct PartyMemberData {
    pub id: PrimaryKey,
    pub user: UserData,
}

/// The state of a join request. Terminal once it leaves `Pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// A pending approval record gating membership to a private party
#[derive(Debug, Clone)]
pub struct JoinRequestData {
    pub id: PrimaryKey,
    pub party_id: PrimaryKey,
    /// The user asking for membership
    pub user: UserData,
    pub status: JoinRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chat message in a party. Append-only, deleted only with its party.
#[derive(Debug, Clone)]
pub struct PartyMessageData {
    pub id: PrimaryKey,
    pub party_id: PrimaryKey,
    pub author: UserData,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl PartyVisibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

impl JoinRequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}
