//! End-to-end archive tests: a populated store is exported, restored into a
//! fresh store, exported again and the two archives are compared in
//! canonical form.

use tempfile::TempDir;
use uuid::Uuid;

use valise_archive::comparator::canonical_form;
use valise_archive::proto::{
    BackupHeader, BackupPurpose, ChatFrame, ChatItemFrame, ChatItemPayloadFrame, DirectionFrame,
    Frame, ReactionFrame, RecipientFrame, RecipientFrameDetail, StandardMessageFrame,
    FORMAT_VERSION,
};
use valise_archive::stream::ArchiveWriter;
use valise_archive::{
    export_backup_file, import_backup_file, ArchiveError, CancelFlag, NoProgress, StreamMode,
};
use valise_shared::content::{
    AccountSettings, ChatAttributes, Contact, IncomingDetail, MessageText, PackSticker, Profile,
    Registration,
};
use valise_shared::crypto::BackupKey;
use valise_shared::identifiers::{Aci, E164, LocalIdentifiers, Pni};
use valise_store::{
    AccountRecord, ChatItemPayload, ChatItemRecord, Database, Direction, DistributionListDetail,
    EditState, RecipientDetail, ReactionRecord, StandardMessage, StickerPackRecord,
};

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("valise_archive=debug,valise_store=info,warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

fn local_identifiers() -> LocalIdentifiers {
    LocalIdentifiers {
        aci: Aci(Uuid::parse_str("7a8709ab-b9af-4ee5-9f33-f82b6e5035a3").unwrap()),
        pni: Pni(Uuid::parse_str("11111111-2222-3333-4444-555555555555").unwrap()),
        e164: E164::parse("+16105550101").unwrap(),
    }
}

fn boba_fett() -> Contact {
    Contact {
        aci: Some(Aci(Uuid::parse_str("aaaaaaaa-bbbb-cccc-dddd-eeeeeeeeeeee").unwrap())),
        pni: None,
        e164: Some(E164::parse("+17735550199").unwrap()),
        username: Some("boba.66".into()),
        registration: Registration::Registered,
        blocked: false,
        hidden: false,
        whitelisted: true,
        profile_key: Some([7u8; 32]),
        profile_given_name: Some("Boba".into()),
        profile_family_name: Some("Fett".into()),
        hide_story: false,
    }
}

fn account_record() -> AccountRecord {
    AccountRecord {
        profile: Profile {
            given_name: "Din".into(),
            family_name: "Djarin".into(),
            avatar_url: None,
            profile_key: Some([1u8; 32]),
        },
        username: Some("mando.99".into()),
        username_link: None,
        donation: None,
        settings: AccountSettings {
            read_receipts: true,
            typing_indicators: true,
            universal_expire_timer_ms: 0,
            ..AccountSettings::default()
        },
    }
}

fn incoming(date_received_ms: u64, read: bool) -> Direction {
    Direction::Incoming(IncomingDetail {
        date_received_ms,
        date_server_sent_ms: Some(date_received_ms),
        read,
        sealed_sender: true,
    })
}

fn text_message(body: &str) -> ChatItemPayload {
    ChatItemPayload::Standard(StandardMessage {
        text: Some(MessageText {
            body: body.into(),
            ranges: Vec::new(),
        }),
        quote: None,
        attachments: Vec::new(),
        link_previews: Vec::new(),
    })
}

fn chat_item(chat_id: i64, author_id: i64, date_sent_ms: u64, body: &str) -> ChatItemRecord {
    ChatItemRecord {
        id: 0,
        chat_id,
        author_id,
        date_sent_ms,
        expire_start_ms: None,
        expire_duration_ms: None,
        sms: false,
        direction: incoming(date_sent_ms, true),
        edit_state: EditState::None,
        latest_revision_id: None,
        payload: text_message(body),
    }
}

/// A store with one of everything: self, a contact, a chat with a message
/// and a reaction, a distribution list and a sticker pack.
fn populated_store(dir: &TempDir) -> Database {
    let db = Database::open_at(&dir.path().join("source.db")).unwrap();
    db.upsert_account(&account_record()).unwrap();

    let myself = db.insert_recipient(&RecipientDetail::Myself).unwrap();
    let boba = db
        .insert_recipient(&RecipientDetail::Contact(boba_fett()))
        .unwrap();
    db.insert_recipient(&RecipientDetail::DistributionList(
        DistributionListDetail::List {
            distribution_id: Uuid::parse_str("99999999-8888-7777-6666-555555555555").unwrap(),
            name: "Bounty hunters".into(),
            allow_replies: true,
            privacy_mode: valise_shared::content::PrivacyMode::OnlyWith,
            member_ids: vec![boba],
        },
    ))
    .unwrap();

    let chat = db.insert_chat(boba, &ChatAttributes::default()).unwrap();
    let hello = db
        .insert_chat_item(&chat_item(chat, boba, 1_700_000_001_000, "hello"))
        .unwrap();
    db.insert_reaction(&ReactionRecord {
        id: 0,
        chat_item_id: hello,
        author_id: myself,
        emoji: "🔥".into(),
        sent_timestamp_ms: 1_700_000_002_000,
        sort_order: 0,
    })
    .unwrap();

    db.upsert_sticker_pack(&StickerPackRecord {
        pack_id: [0xAB; 16],
        pack_key: [0xCD; 32],
        stickers: vec![PackSticker {
            id: 0,
            emoji: Some("🚀".into()),
        }],
    })
    .unwrap();

    db
}

async fn export(
    db: &mut Database,
    path: &std::path::Path,
    mode: &StreamMode,
) -> valise_archive::ExportStats {
    export_backup_file(
        path,
        db,
        &local_identifiers(),
        mode,
        BackupPurpose::LocalExport,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_round_trip_preserves_canonical_form() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mode = StreamMode::Encrypted(BackupKey::generate());

    let mut source = populated_store(&dir);
    let first = dir.path().join("first.vbk");
    let stats = export(&mut source, &first, &mode).await;
    assert_eq!(stats.recipients_written, 3);
    assert_eq!(stats.chats_written, 1);
    assert_eq!(stats.chat_items_written, 1);
    assert_eq!(stats.reactions_written, 1);
    assert_eq!(stats.sticker_packs_written, 1);

    let mut restored = Database::open_at(&dir.path().join("restored.db")).unwrap();
    let stats = import_backup_file(
        &first,
        &mut restored,
        &local_identifiers(),
        &mode,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(stats.recipients_imported, 3);
    assert_eq!(stats.chat_items_imported, 1);
    assert_eq!(stats.skipped_unknown_frames, 0);

    let second = dir.path().join("second.vbk");
    export(&mut restored, &second, &mode).await;

    assert_eq!(
        canonical_form(&first, &mode).await.unwrap(),
        canonical_form(&second, &mode).await.unwrap()
    );
}

#[tokio::test]
async fn test_import_into_plaintext_round_trip() {
    let dir = TempDir::new().unwrap();
    let mode = StreamMode::Plaintext;

    let mut source = populated_store(&dir);
    let path = dir.path().join("plain.vbk");
    export(&mut source, &path, &mode).await;

    let mut restored = Database::open_at(&dir.path().join("restored.db")).unwrap();
    import_backup_file(
        &path,
        &mut restored,
        &local_identifiers(),
        &mode,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    let chats = restored.list_chats().unwrap();
    assert_eq!(chats.len(), 1);
    let items = restored.list_chat_items(chats[0].id).unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].payload, text_message("hello"));
}

#[tokio::test]
async fn test_export_without_account_fails() {
    let dir = TempDir::new().unwrap();
    let mut empty = Database::open_at(&dir.path().join("empty.db")).unwrap();
    let path = dir.path().join("never.vbk");

    let result = export_backup_file(
        &path,
        &mut empty,
        &local_identifiers(),
        &StreamMode::Plaintext,
        BackupPurpose::LocalExport,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await;

    assert!(matches!(result, Err(ArchiveError::MissingAccountData)));
    // The partial file must not survive a failed export.
    assert!(!path.exists());
}

/// Writes a hand-built archive: header, then the given frames in order.
async fn write_archive(path: &std::path::Path, mode: &StreamMode, frames: &[Frame]) {
    let mut writer = ArchiveWriter::create(path, mode).await.unwrap();
    writer
        .write_header(&BackupHeader {
            version: FORMAT_VERSION,
            backup_time_ms: 1_700_000_000_000,
            purpose: BackupPurpose::LocalExport,
        })
        .await
        .unwrap();
    for frame in frames {
        writer.write_payload(&frame.to_bytes().unwrap()).await.unwrap();
    }
    writer.finalize().await.unwrap();
}

fn account_frame() -> Frame {
    let record = account_record();
    Frame::Account(valise_archive::proto::AccountFrame {
        profile: record.profile,
        username: record.username,
        username_link: record.username_link,
        donation: record.donation,
        settings: record.settings,
    })
}

fn item_frame(date_sent_ms: u64, body: &str) -> ChatItemFrame {
    ChatItemFrame {
        id: 0,
        chat_id: 1,
        author_id: 2,
        date_sent_ms,
        expire_start_ms: None,
        expire_duration_ms: None,
        sms: false,
        direction: DirectionFrame::Incoming(IncomingDetail {
            date_received_ms: date_sent_ms,
            date_server_sent_ms: None,
            read: true,
            sealed_sender: false,
        }),
        revisions: Vec::new(),
        payload: ChatItemPayloadFrame::Standard(StandardMessageFrame {
            text: Some(MessageText {
                body: body.into(),
                ranges: Vec::new(),
            }),
            quote: None,
            attachments: Vec::new(),
            link_previews: Vec::new(),
        }),
    }
}

#[tokio::test]
async fn test_dangling_reference_rejected_and_rolled_back() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("dangling.vbk");

    // A chat pointing at recipient 42, which no frame introduces.
    write_archive(
        &path,
        &StreamMode::Plaintext,
        &[
            account_frame(),
            Frame::Chat(ChatFrame {
                id: 1,
                recipient_id: 42,
                attributes: ChatAttributes::default(),
            }),
        ],
    )
    .await;

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    let result = import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await;

    assert!(matches!(result, Err(ArchiveError::UnresolvedRecipient(42))));
    // Rolled back: nothing reached the store, not even the account frame.
    assert!(db.get_account().unwrap().is_none());
    assert!(db.list_recipients().unwrap().is_empty());
}

#[tokio::test]
async fn test_edit_history_latest_is_chosen_by_timestamp() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edits.vbk");

    // The outer frame is not the newest revision and the nested ones are in
    // no particular order; the restore must still pick t=3000 as latest.
    let mut outer = item_frame(1000, "hella");
    outer.id = 7;
    outer.revisions = vec![item_frame(3000, "hello"), item_frame(2000, "helo")];

    write_archive(
        &path,
        &StreamMode::Plaintext,
        &[
            account_frame(),
            Frame::Recipient(RecipientFrame {
                id: 2,
                detail: RecipientFrameDetail::Contact(boba_fett()),
            }),
            Frame::Chat(ChatFrame {
                id: 1,
                recipient_id: 2,
                attributes: ChatAttributes::default(),
            }),
            Frame::ChatItem(outer),
        ],
    )
    .await;

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    let chats = db.list_chats().unwrap();
    let items = db.list_chat_items(chats[0].id).unwrap();
    assert_eq!(items.len(), 3);

    let latest: Vec<_> = items
        .iter()
        .filter(|i| {
            matches!(
                i.edit_state,
                EditState::LatestRevisionRead | EditState::LatestRevisionUnread
            )
        })
        .collect();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].date_sent_ms, 3000);
    assert_eq!(latest[0].payload, text_message("hello"));

    for item in items.iter().filter(|i| i.edit_state == EditState::PastRevision) {
        assert_eq!(item.latest_revision_id, Some(latest[0].id));
        assert!(item.date_sent_ms < 3000);
    }
}

#[tokio::test]
async fn test_reaction_attaches_to_latest_revision() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("edits_reacted.vbk");

    // A reaction targets the chain, and the latest revision is nested rather
    // than outer; after restore the reaction must sit on the t=3000 row.
    let mut outer = item_frame(1000, "hella");
    outer.id = 7;
    outer.revisions = vec![item_frame(3000, "hello"), item_frame(2000, "helo")];

    write_archive(
        &path,
        &StreamMode::Plaintext,
        &[
            account_frame(),
            Frame::Recipient(RecipientFrame {
                id: 2,
                detail: RecipientFrameDetail::Contact(boba_fett()),
            }),
            Frame::Chat(ChatFrame {
                id: 1,
                recipient_id: 2,
                attributes: ChatAttributes::default(),
            }),
            Frame::ChatItem(outer),
            Frame::Reaction(ReactionFrame {
                chat_item_id: 7,
                author_id: 2,
                emoji: "🔥".into(),
                sent_timestamp_ms: 4000,
                sort_order: 0,
            }),
        ],
    )
    .await;

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    let stats = import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(stats.reactions_imported, 1);

    let chats = db.list_chats().unwrap();
    let items = db.list_chat_items(chats[0].id).unwrap();
    assert_eq!(items.len(), 3);

    for item in &items {
        let reactions = db.list_reactions(item.id).unwrap();
        if item.date_sent_ms == 3000 {
            assert!(matches!(
                item.edit_state,
                EditState::LatestRevisionRead | EditState::LatestRevisionUnread
            ));
            assert_eq!(reactions.len(), 1);
            assert_eq!(reactions[0].emoji, "🔥");
            assert_eq!(reactions[0].chat_item_id, item.id);
        } else {
            // Past revisions never carry reactions.
            assert_eq!(item.edit_state, EditState::PastRevision);
            assert!(reactions.is_empty());
        }
    }
}

#[tokio::test]
async fn test_round_trip_of_store_with_edit_chain() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("source.db")).unwrap();
    db.upsert_account(&account_record()).unwrap();
    db.insert_recipient(&RecipientDetail::Myself).unwrap();
    let boba = db
        .insert_recipient(&RecipientDetail::Contact(boba_fett()))
        .unwrap();
    let chat = db.insert_chat(boba, &ChatAttributes::default()).unwrap();

    // Insert newest-first so store rowid order disagrees with timestamps.
    let mut latest = chat_item(chat, boba, 3000, "hello");
    latest.edit_state = EditState::LatestRevisionRead;
    let latest_id = db.insert_chat_item(&latest).unwrap();
    for (ts, body) in [(1000u64, "hella"), (2000, "helo")] {
        let mut past = chat_item(chat, boba, ts, body);
        past.edit_state = EditState::PastRevision;
        past.latest_revision_id = Some(latest_id);
        db.insert_chat_item(&past).unwrap();
    }

    let mut source = db;
    let path = dir.path().join("chain.vbk");
    let stats = export(&mut source, &path, &StreamMode::Plaintext).await;
    // One chain, one frame.
    assert_eq!(stats.chat_items_written, 1);

    let mut restored = Database::open_at(&dir.path().join("restored.db")).unwrap();
    import_backup_file(
        &path,
        &mut restored,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    let chats = restored.list_chats().unwrap();
    let items = restored.list_chat_items(chats[0].id).unwrap();
    assert_eq!(items.len(), 3);
    let latest: Vec<_> = items
        .iter()
        .filter(|i| i.edit_state == EditState::LatestRevisionRead)
        .collect();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].date_sent_ms, 3000);
}

#[tokio::test]
async fn test_unknown_frame_kind_is_skipped() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("future.vbk");

    // An archive from some future format revision: one frame carries a kind
    // tag this build has never heard of.
    let mode = StreamMode::Plaintext;
    let mut writer = ArchiveWriter::create(&path, &mode).await.unwrap();
    writer
        .write_header(&BackupHeader {
            version: FORMAT_VERSION,
            backup_time_ms: 1_700_000_000_000,
            purpose: BackupPurpose::LocalExport,
        })
        .await
        .unwrap();
    writer
        .write_payload(&account_frame().to_bytes().unwrap())
        .await
        .unwrap();
    writer
        .write_payload(
            &Frame::Recipient(RecipientFrame {
                id: 1,
                detail: RecipientFrameDetail::Myself,
            })
            .to_bytes()
            .unwrap(),
        )
        .await
        .unwrap();
    writer.write_payload(&[0x7F, 0xDE, 0xAD, 0xBE, 0xEF]).await.unwrap();
    writer
        .write_payload(
            &Frame::Recipient(RecipientFrame {
                id: 2,
                detail: RecipientFrameDetail::Contact(boba_fett()),
            })
            .to_bytes()
            .unwrap(),
        )
        .await
        .unwrap();
    writer
        .write_payload(
            &Frame::Chat(ChatFrame {
                id: 3,
                recipient_id: 2,
                attributes: ChatAttributes::default(),
            })
            .to_bytes()
            .unwrap(),
        )
        .await
        .unwrap();
    writer.finalize().await.unwrap();

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    let stats = import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &mode,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();

    // The unrecognized frame is counted and skipped; everything around it
    // still lands.
    assert_eq!(stats.skipped_unknown_frames, 1);
    assert_eq!(stats.recipients_imported, 2);
    assert_eq!(stats.chats_imported, 1);
    assert_eq!(db.list_recipients().unwrap().len(), 2);
    assert_eq!(db.list_chats().unwrap().len(), 1);
}

#[tokio::test]
async fn test_expired_tombstone_dropped_on_export() {
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("source.db")).unwrap();
    db.upsert_account(&account_record()).unwrap();
    db.insert_recipient(&RecipientDetail::Myself).unwrap();

    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    let day_ms = 24 * 60 * 60 * 1000;
    db.insert_recipient(&RecipientDetail::DistributionList(
        DistributionListDetail::Tombstone {
            distribution_id: Uuid::parse_str("00000000-0000-0000-0000-0000000000aa").unwrap(),
            deletion_timestamp_ms: now_ms - 400 * day_ms,
        },
    ))
    .unwrap();
    db.insert_recipient(&RecipientDetail::DistributionList(
        DistributionListDetail::Tombstone {
            distribution_id: Uuid::parse_str("00000000-0000-0000-0000-0000000000bb").unwrap(),
            deletion_timestamp_ms: now_ms - 10 * day_ms,
        },
    ))
    .unwrap();

    let mut source = db;
    let path = dir.path().join("tombstones.vbk");
    let stats = export(&mut source, &path, &StreamMode::Plaintext).await;
    assert_eq!(stats.expired_tombstones, 1);
    assert_eq!(stats.recipients_written, 2); // self + fresh tombstone

    let mut restored = Database::open_at(&dir.path().join("restored.db")).unwrap();
    let stats = import_backup_file(
        &path,
        &mut restored,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(stats.recipients_imported, 2);

    let recipients = restored.list_recipients().unwrap();
    let tombstones: Vec<_> = recipients
        .iter()
        .filter_map(|r| match &r.detail {
            RecipientDetail::DistributionList(DistributionListDetail::Tombstone {
                distribution_id,
                ..
            }) => Some(*distribution_id),
            _ => None,
        })
        .collect();
    assert_eq!(
        tombstones,
        vec![Uuid::parse_str("00000000-0000-0000-0000-0000000000bb").unwrap()]
    );
}

#[tokio::test]
async fn test_chat_of_expired_tombstone_recipient_is_skipped() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let db = Database::open_at(&dir.path().join("source.db")).unwrap();
    db.upsert_account(&account_record()).unwrap();
    let myself = db.insert_recipient(&RecipientDetail::Myself).unwrap();

    let now_ms = chrono::Utc::now().timestamp_millis() as u64;
    let day_ms = 24 * 60 * 60 * 1000;
    let stale = db
        .insert_recipient(&RecipientDetail::DistributionList(
            DistributionListDetail::Tombstone {
                distribution_id: Uuid::parse_str("00000000-0000-0000-0000-0000000000cc").unwrap(),
                deletion_timestamp_ms: now_ms - 400 * day_ms,
            },
        ))
        .unwrap();

    // A chat still points at the aged-out recipient. Writing it would leave
    // the archive with a reference no frame introduces, so the chat and its
    // items are dropped together with the recipient.
    let chat = db.insert_chat(stale, &ChatAttributes::default()).unwrap();
    db.insert_chat_item(&chat_item(chat, myself, 1_700_000_003_000, "story"))
        .unwrap();

    let mut source = db;
    let path = dir.path().join("stale_chat.vbk");
    let stats = export(&mut source, &path, &StreamMode::Plaintext).await;
    assert_eq!(stats.expired_tombstones, 1);
    assert_eq!(stats.recipients_written, 1); // self only
    assert_eq!(stats.chats_written, 0);
    assert_eq!(stats.chat_items_written, 0);

    // The archive it produced is self-consistent and imports cleanly.
    let mut restored = Database::open_at(&dir.path().join("restored.db")).unwrap();
    let stats = import_backup_file(
        &path,
        &mut restored,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await
    .unwrap();
    assert_eq!(stats.recipients_imported, 1);
    assert!(restored.list_chats().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_import_rolls_back() {
    let dir = TempDir::new().unwrap();
    let mut source = populated_store(&dir);
    let path = dir.path().join("cancel.vbk");
    export(&mut source, &path, &StreamMode::Plaintext).await;

    let cancel = CancelFlag::new();
    cancel.cancel();

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    let result = import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &StreamMode::Plaintext,
        &mut NoProgress,
        &cancel,
    )
    .await;

    assert!(matches!(result, Err(ArchiveError::Cancelled)));
    assert!(db.get_account().unwrap().is_none());
    assert!(db.list_recipients().unwrap().is_empty());
}

#[tokio::test]
async fn test_cancelled_export_removes_partial_file() {
    let dir = TempDir::new().unwrap();
    let mut source = populated_store(&dir);
    let path = dir.path().join("cancel.vbk");

    let cancel = CancelFlag::new();
    cancel.cancel();

    let result = export_backup_file(
        &path,
        &mut source,
        &local_identifiers(),
        &StreamMode::Plaintext,
        BackupPurpose::LocalExport,
        &mut NoProgress,
        &cancel,
    )
    .await;

    assert!(matches!(result, Err(ArchiveError::Cancelled)));
    assert!(!path.exists());
}

#[tokio::test]
async fn test_wrong_key_fails_before_any_frame() {
    let dir = TempDir::new().unwrap();
    let mut source = populated_store(&dir);
    let path = dir.path().join("secret.vbk");
    export(&mut source, &path, &StreamMode::Encrypted(BackupKey::generate())).await;

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    let result = import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &StreamMode::Encrypted(BackupKey::generate()),
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await;

    assert!(matches!(result, Err(ArchiveError::MacValidationFailed)));
    assert!(db.get_account().unwrap().is_none());
}

#[tokio::test]
async fn test_newer_format_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("vnext.vbk");

    let mode = StreamMode::Plaintext;
    let mut writer = ArchiveWriter::create(&path, &mode).await.unwrap();
    writer
        .write_header(&BackupHeader {
            version: FORMAT_VERSION + 1,
            backup_time_ms: 1_700_000_000_000,
            purpose: BackupPurpose::LocalExport,
        })
        .await
        .unwrap();
    writer.finalize().await.unwrap();

    let mut db = Database::open_at(&dir.path().join("target.db")).unwrap();
    let result = import_backup_file(
        &path,
        &mut db,
        &local_identifiers(),
        &mode,
        &mut NoProgress,
        &CancelFlag::new(),
    )
    .await;

    assert!(matches!(result, Err(ArchiveError::UnsupportedVersion(v)) if v == FORMAT_VERSION + 1));
}
