//! Invitation lifecycle for partner pairing.
//!
//! `pending` moves to `accepted`, `declined` or `expired`. The other three states are terminal.
//! The checks here are pure; `db::partner` runs them against rows it has loaded and applies the
//! resulting writes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD as b64_urlsafe;
use base64::Engine;
use std::fmt;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::db::DaoError;
use crate::models::partner_invitation::{InvitationStatus, PartnerInvitation};
use crate::threadrand::SecureRng;

pub const INVITATION_LIFETIME: Duration = Duration::from_secs(7 * 24 * 60 * 60);
pub const INVITATION_TOKEN_BYTES: usize = 32;

#[derive(Debug)]
pub enum PartnerError {
    AlreadyPartnered,
    DuplicateInvitation,
    SelfInvitation,
    UserNotFound,
    InvitationNotFound,
    InvitationExpired,
    NotPermitted,
    NoPartner,
    Dao(DaoError),
}

impl std::error::Error for PartnerError {}

impl fmt::Display for PartnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PartnerError::AlreadyPartnered => write!(f, "A user in this pair already has a partner"),
            PartnerError::DuplicateInvitation => {
                write!(f, "A pending invitation already exists between these users")
            }
            PartnerError::SelfInvitation => write!(f, "Users cannot invite themselves"),
            PartnerError::UserNotFound => write!(f, "Invited user does not exist"),
            PartnerError::InvitationNotFound => write!(f, "Invitation not found"),
            PartnerError::InvitationExpired => write!(f, "Invitation has expired"),
            PartnerError::NotPermitted => {
                write!(f, "User is not permitted to act on this invitation")
            }
            PartnerError::NoPartner => write!(f, "User does not have a partner"),
            PartnerError::Dao(e) => write!(f, "PartnerError: {e}"),
        }
    }
}

impl From<DaoError> for PartnerError {
    fn from(error: DaoError) -> Self {
        PartnerError::Dao(error)
    }
}

impl From<diesel::result::Error> for PartnerError {
    fn from(error: diesel::result::Error) -> Self {
        PartnerError::Dao(DaoError::from(error))
    }
}

impl<E: std::error::Error + Send + Sync + 'static> From<bb8::RunError<E>> for PartnerError {
    fn from(error: bb8::RunError<E>) -> Self {
        PartnerError::Dao(DaoError::from(error))
    }
}

/// Which side of an invitation an action belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Party {
    Sender,
    Recipient,
}

/// Outcome of checking a pending invitation before moving it out of `pending`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransitionCheck {
    Proceed,
    /// The invitation outlived its lifetime. It must be marked expired, and the action fails.
    ExpireNow,
}

pub fn invitation_expiry(created: SystemTime) -> SystemTime {
    created + INVITATION_LIFETIME
}

pub fn generate_invitation_token() -> String {
    let mut bytes = [0u8; INVITATION_TOKEN_BYTES];
    rand::RngCore::fill_bytes(&mut SecureRng, &mut bytes);
    b64_urlsafe.encode(bytes)
}

pub fn check_invite(
    from_user_id: Uuid,
    to_user_id: Uuid,
    either_has_partner: bool,
    pending_between_pair: bool,
) -> Result<(), PartnerError> {
    if from_user_id == to_user_id {
        return Err(PartnerError::SelfInvitation);
    }

    if either_has_partner {
        return Err(PartnerError::AlreadyPartnered);
    }

    if pending_between_pair {
        return Err(PartnerError::DuplicateInvitation);
    }

    Ok(())
}

/// Checks that `actor` may move `invitation` out of `pending` acting as `party`.
///
/// An invitation the actor is not part of looks the same as one that doesn't exist, as do
/// accepted and declined ones. An expired one reports expiry every time it is touched, but only
/// a still-pending one asks for the transition to be written.
pub fn check_transition(
    invitation: &PartnerInvitation,
    actor: Uuid,
    party: Party,
    now: SystemTime,
) -> Result<TransitionCheck, PartnerError> {
    let (acting_side, other_side) = match party {
        Party::Sender => (invitation.from_user_id, invitation.to_user_id),
        Party::Recipient => (invitation.to_user_id, invitation.from_user_id),
    };

    if actor != acting_side {
        return if actor == other_side {
            Err(PartnerError::NotPermitted)
        } else {
            Err(PartnerError::InvitationNotFound)
        };
    }

    match invitation.status {
        InvitationStatus::Accepted | InvitationStatus::Declined => {
            Err(PartnerError::InvitationNotFound)
        }
        InvitationStatus::Expired => Err(PartnerError::InvitationExpired),
        InvitationStatus::Pending if invitation.expires_at <= now => Ok(TransitionCheck::ExpireNow),
        InvitationStatus::Pending => Ok(TransitionCheck::Proceed),
    }
}
