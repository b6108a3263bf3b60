//! Directory entry -> identity record

use crate::ldap::dn::GroupPath;
use crate::ldap::types::DirectoryEntry;
use dirauth_core::types::IdentityRecord;
use tracing::debug;

pub const ATTR_MAIL: &str = "mail";
pub const ATTR_ACCOUNT_NAME: &str = "sAMAccountName";
pub const ATTR_DISPLAY_NAME: &str = "name";
pub const ATTR_MEMBER_OF: &str = "memberOf";

/// Flatten one entry. Entries missing any of `mail`, `sAMAccountName`,
/// `name` or `memberOf`, or with an unparseable `memberOf`, yield `None`.
pub fn normalize(entry: &DirectoryEntry) -> Option<IdentityRecord> {
    let (Some(email), Some(username), Some(nickname), Some(member_of)) = (
        entry.first_value(ATTR_MAIL),
        entry.first_value(ATTR_ACCOUNT_NAME),
        entry.first_value(ATTR_DISPLAY_NAME),
        entry.first_value(ATTR_MEMBER_OF),
    ) else {
        debug!(dn = %entry.dn, "Skipping entry with incomplete attributes");
        return None;
    };

    let group = match GroupPath::parse(member_of) {
        Ok(group) => group,
        Err(e) => {
            debug!(dn = %entry.dn, error = %e, "Skipping entry with malformed memberOf");
            return None;
        }
    };

    Some(IdentityRecord {
        email: email.to_string(),
        authenticated: true,
        message: None,
        username: username.to_string(),
        nickname: nickname.to_string(),
        department: group.department,
        organization: group.organization,
    })
}
