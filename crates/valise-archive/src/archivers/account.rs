//! Account data archiver. Exactly one AccountData frame exists per archive;
//! the manager enforces the cardinality, this module only translates.

use valise_store::{AccountRecord, StoreWriter};

use crate::error::Result;
use crate::proto::AccountFrame;

pub fn archive(record: &AccountRecord) -> AccountFrame {
    AccountFrame {
        profile: record.profile.clone(),
        username: record.username.clone(),
        username_link: record.username_link.clone(),
        donation: record.donation.clone(),
        settings: record.settings.clone(),
    }
}

pub fn restore<W: StoreWriter>(frame: AccountFrame, writer: &mut W) -> Result<()> {
    let record = AccountRecord {
        profile: frame.profile,
        username: frame.username,
        username_link: frame.username_link,
        donation: frame.donation,
        settings: frame.settings,
    };
    writer.insert_account(&record)?;
    Ok(())
}
