use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== Classification =====

/// Coarse deliverability verdict for a single address.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryClassification {
    Deliverable,
    Risky,
    Undeliverable,
    Unknown,
}

impl fmt::Display for EntryClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deliverable => write!(f, "Deliverable"),
            Self::Risky => write!(f, "Risky"),
            Self::Undeliverable => write!(f, "Undeliverable"),
            Self::Unknown => write!(f, "Unknown"),
        }
    }
}

// ===== Status =====

/// Fine-grained outcome explaining an entry's classification.
///
/// Codes introduced by the service after this client was built deserialize
/// as [`EntryStatus::Unrecognized`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum EntryStatus {
    Success,
    CatchAllConnectionFailure,
    CatchAllValidationTimeout,
    DnsConnectionFailure,
    DnsQueryTimeout,
    DomainDoesNotExist,
    DomainHasNullMx,
    DomainIsMisconfigured,
    DomainIsWellKnownDea,
    DomainPartCompliancyFailure,
    DoubleDotSequence,
    Duplicate,
    InvalidAddressLength,
    InvalidCharacterInSequence,
    InvalidEmptyQuotedWord,
    InvalidFoldingWhiteSpaceSequence,
    InvalidLocalPartLength,
    InvalidWordBoundaryStart,
    IspSpecificSyntaxFailure,
    LocalEndPointRejected,
    LocalPartIsWellKnownRoleAccount,
    LocalSenderAddressRejected,
    MailboxConnectionFailure,
    MailboxDoesNotExist,
    MailboxHasInsufficientStorage,
    MailboxIsDea,
    MailboxTemporarilyUnavailable,
    MailboxValidationTimeout,
    MailExchangerIsHoneypot,
    MailExchangerIsParked,
    MailExchangerIsWellKnownDea,
    OverrideMatch,
    ServerDoesNotSupportInternationalMailboxes,
    ServerIsCatchAll,
    ServerTemporaryUnavailable,
    SmtpConnectionFailure,
    SmtpConnectionTimeout,
    SmtpDialogError,
    UnacceptableDomainLiteral,
    UnbalancedCommentParenthesis,
    UnexpectedQuotedPairSequence,
    UnhandledException,
    UnmatchedQuotedPair,
    #[serde(other)]
    Unrecognized,
}

impl EntryStatus {
    /// Whether the status comes from the syntax checks rather than DNS or SMTP.
    pub fn is_syntax_failure(&self) -> bool {
        matches!(
            self,
            EntryStatus::DomainPartCompliancyFailure
                | EntryStatus::DoubleDotSequence
                | EntryStatus::InvalidAddressLength
                | EntryStatus::InvalidCharacterInSequence
                | EntryStatus::InvalidEmptyQuotedWord
                | EntryStatus::InvalidFoldingWhiteSpaceSequence
                | EntryStatus::InvalidLocalPartLength
                | EntryStatus::InvalidWordBoundaryStart
                | EntryStatus::IspSpecificSyntaxFailure
                | EntryStatus::UnacceptableDomainLiteral
                | EntryStatus::UnbalancedCommentParenthesis
                | EntryStatus::UnexpectedQuotedPairSequence
                | EntryStatus::UnmatchedQuotedPair
        )
    }
}

// ===== Entry =====

/// Verification result for one submitted address.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEntry {
    #[serde(default)]
    pub index: u32,
    pub input_data: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom: Option<String>,
    pub classification: EntryClassification,
    pub status: EntryStatus,
    /// Index of the entry this one duplicates; set when `status` is `Duplicate`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address_local_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address_domain_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ascii_email_address_domain_part: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_international_mailbox_name: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_international_domain_name: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_disposable_email_address: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_role_account: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_free_email_address: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_failure_index: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_on: Option<DateTime<Utc>>,
}

impl ValidationEntry {
    pub fn is_duplicate(&self) -> bool {
        matches!(self.status, EntryStatus::Duplicate)
    }

    pub fn is_deliverable(&self) -> bool {
        matches!(self.classification, EntryClassification::Deliverable)
    }
}
