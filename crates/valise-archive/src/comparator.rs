//! Canonical textual rendering of an archive, for equivalence checks.
//!
//! Two archives of the same logical state can differ byte-for-byte: archive
//! ids depend on enumeration order, frames of independent families can be
//! interleaved differently, and the header carries the export wall-clock
//! time. `canonical_form` flattens all of that: frames are sorted by the
//! natural key of the entity they describe, ids are renumbered in that
//! canonical order, and the result is rendered one frame per line as JSON.
//! Equal strings mean equivalent archives.
//!
//! Frames of unknown kind carry content we cannot interpret and are left out
//! of the rendering.

use std::collections::HashMap;
use std::path::Path;

use crate::error::{ArchiveError, Result};
use crate::proto::{
    ChatFrame, ChatItemFrame, ChatItemPayloadFrame, ChatUpdateFrame, DirectionFrame,
    DistributionListFrame, Frame, GroupCallFrame, RecipientFrame, RecipientFrameDetail,
    ReactionFrame, StickerPackFrame,
};
use crate::stream::{ArchiveReader, StreamMode};

/// Read the archive at `path` and render it in canonical form.
pub async fn canonical_form(path: &Path, mode: &StreamMode) -> Result<String> {
    let mut reader = ArchiveReader::open(path, mode).await?;
    let header = reader.read_header().await?;

    let mut account = None;
    let mut recipients = Vec::new();
    let mut chats = Vec::new();
    let mut chat_items = Vec::new();
    let mut reactions = Vec::new();
    let mut sticker_packs = Vec::new();

    while let Some(payload) = reader.next_payload().await? {
        match Frame::from_bytes(&payload)? {
            Some(Frame::Account(f)) => account = Some(f),
            Some(Frame::Recipient(f)) => recipients.push(f),
            Some(Frame::Chat(f)) => chats.push(f),
            Some(Frame::ChatItem(f)) => chat_items.push(f),
            Some(Frame::Reaction(f)) => reactions.push(f),
            Some(Frame::StickerPack(f)) => sticker_packs.push(f),
            None => {}
        }
    }

    // Recipients first: everything else resolves through their renumbering.
    recipients.sort_by(|a, b| recipient_sort_key(&a.detail).cmp(&recipient_sort_key(&b.detail)));
    let recipient_map: HashMap<u64, u64> = recipients
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id, i as u64 + 1))
        .collect();
    for (i, frame) in recipients.iter_mut().enumerate() {
        frame.id = i as u64 + 1;
        remap_recipient_detail(&mut frame.detail, &recipient_map)?;
    }

    for frame in &mut chats {
        frame.recipient_id = remap(&recipient_map, frame.recipient_id, ArchiveError::UnresolvedRecipient)?;
    }
    chats.sort_by_key(|f| f.recipient_id);
    let chat_map: HashMap<u64, u64> = chats
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id, i as u64 + 1))
        .collect();
    for (i, frame) in chats.iter_mut().enumerate() {
        frame.id = i as u64 + 1;
    }

    for frame in &mut chat_items {
        remap_chat_item(frame, &recipient_map, &chat_map)?;
    }
    chat_items.sort_by_key(|f| (f.chat_id, f.date_sent_ms, f.author_id));
    let item_map: HashMap<u64, u64> = chat_items
        .iter()
        .enumerate()
        .map(|(i, f)| (f.id, i as u64 + 1))
        .collect();
    for (i, frame) in chat_items.iter_mut().enumerate() {
        frame.id = i as u64 + 1;
    }

    for frame in &mut reactions {
        frame.chat_item_id = remap(&item_map, frame.chat_item_id, ArchiveError::UnresolvedChatItem)?;
        frame.author_id = remap(&recipient_map, frame.author_id, ArchiveError::UnresolvedRecipient)?;
    }
    reactions.sort_by(|a, b| {
        (a.chat_item_id, a.sort_order, a.author_id).cmp(&(b.chat_item_id, b.sort_order, b.author_id))
    });

    sticker_packs.sort_by_key(|f| f.pack_id);

    // The export wall-clock time is not part of the logical state being
    // compared, so the header line leaves backup_time_ms out.
    let header_line = format!("header version={} purpose={:?}", header.version, header.purpose);

    render(
        &header_line,
        account.as_ref(),
        &recipients,
        &chats,
        &chat_items,
        &reactions,
        &sticker_packs,
    )
}

/// A total order over recipients that does not depend on archive ids:
/// self, then contacts by service id and number, then groups by master key,
/// then distribution lists by distribution id, then call links by root key.
fn recipient_sort_key(detail: &RecipientFrameDetail) -> (u8, String) {
    match detail {
        RecipientFrameDetail::Myself => (0, String::new()),
        RecipientFrameDetail::Contact(c) => {
            let aci = c.aci.as_ref().map(|a| a.0.to_string()).unwrap_or_default();
            let pni = c.pni.as_ref().map(|p| p.0.to_string()).unwrap_or_default();
            let e164 = c.e164.as_ref().map(|e| e.as_str()).unwrap_or_default();
            (1, format!("{aci}|{pni}|{e164}"))
        }
        RecipientFrameDetail::Group(g) => (2, hex::encode(g.master_key)),
        RecipientFrameDetail::DistributionList(
            DistributionListFrame::Tombstone { distribution_id, .. }
            | DistributionListFrame::List { distribution_id, .. },
        ) => (3, distribution_id.to_string()),
        RecipientFrameDetail::CallLink(l) => (4, hex::encode(&l.root_key)),
    }
}

fn remap(
    map: &HashMap<u64, u64>,
    id: u64,
    unresolved: fn(u64) -> ArchiveError,
) -> Result<u64> {
    map.get(&id).copied().ok_or_else(|| unresolved(id))
}

fn remap_recipient_detail(
    detail: &mut RecipientFrameDetail,
    recipients: &HashMap<u64, u64>,
) -> Result<()> {
    if let RecipientFrameDetail::DistributionList(DistributionListFrame::List {
        member_ids, ..
    }) = detail
    {
        for id in member_ids.iter_mut() {
            *id = remap(recipients, *id, ArchiveError::UnresolvedRecipient)?;
        }
        member_ids.sort_unstable();
    }
    Ok(())
}

fn remap_chat_item(
    frame: &mut ChatItemFrame,
    recipients: &HashMap<u64, u64>,
    chats: &HashMap<u64, u64>,
) -> Result<()> {
    frame.chat_id = remap(chats, frame.chat_id, ArchiveError::UnresolvedChat)?;
    frame.author_id = remap(recipients, frame.author_id, ArchiveError::UnresolvedRecipient)?;

    if let DirectionFrame::Outgoing { send_status } = &mut frame.direction {
        for status in send_status.iter_mut() {
            status.recipient_id =
                remap(recipients, status.recipient_id, ArchiveError::UnresolvedRecipient)?;
        }
        send_status.sort_by_key(|s| s.recipient_id);
    }

    match &mut frame.payload {
        ChatItemPayloadFrame::Standard(msg) => {
            if let Some(quote) = &mut msg.quote {
                quote.author_id =
                    remap(recipients, quote.author_id, ArchiveError::UnresolvedRecipient)?;
            }
        }
        ChatItemPayloadFrame::Update(ChatUpdateFrame::GroupCall(call)) => {
            remap_group_call(call, recipients)?;
        }
        _ => {}
    }

    for revision in &mut frame.revisions {
        remap_chat_item(revision, recipients, chats)?;
        revision.id = 0;
    }
    frame.revisions.sort_by_key(|r| r.date_sent_ms);
    Ok(())
}

fn remap_group_call(call: &mut GroupCallFrame, recipients: &HashMap<u64, u64>) -> Result<()> {
    if let Some(id) = call.ringer_id {
        call.ringer_id = Some(remap(recipients, id, ArchiveError::UnresolvedRecipient)?);
    }
    if let Some(id) = call.started_by_id {
        call.started_by_id = Some(remap(recipients, id, ArchiveError::UnresolvedRecipient)?);
    }
    Ok(())
}

fn render(
    header: &str,
    account: Option<&crate::proto::AccountFrame>,
    recipients: &[RecipientFrame],
    chats: &[ChatFrame],
    chat_items: &[ChatItemFrame],
    reactions: &[ReactionFrame],
    sticker_packs: &[StickerPackFrame],
) -> Result<String> {
    let mut out = String::new();
    out.push_str(header);
    out.push('\n');

    if let Some(account) = account {
        push_line(&mut out, "account", account)?;
    }
    for f in recipients {
        push_line(&mut out, "recipient", f)?;
    }
    for f in chats {
        push_line(&mut out, "chat", f)?;
    }
    for f in chat_items {
        push_line(&mut out, "chat_item", f)?;
    }
    for f in reactions {
        push_line(&mut out, "reaction", f)?;
    }
    for f in sticker_packs {
        push_line(&mut out, "sticker_pack", f)?;
    }
    Ok(out)
}

fn push_line<T: serde::Serialize>(out: &mut String, label: &str, value: &T) -> Result<()> {
    let json = serde_json::to_string(value)
        .map_err(|e| ArchiveError::FrameDecode(e.to_string()))?;
    out.push_str(label);
    out.push(' ');
    out.push_str(&json);
    out.push('\n');
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    use crate::proto::{BackupHeader, BackupPurpose, FORMAT_VERSION};
    use crate::stream::ArchiveWriter;
    use valise_shared::content::{Contact, Registration};
    use valise_shared::{Aci, E164};

    fn contact(aci: &str, e164: &str) -> RecipientFrameDetail {
        RecipientFrameDetail::Contact(Contact {
            aci: Some(Aci(Uuid::parse_str(aci).unwrap())),
            pni: None,
            e164: Some(E164::parse(e164).unwrap()),
            username: None,
            registration: Registration::Registered,
            blocked: false,
            hidden: false,
            whitelisted: true,
            profile_key: None,
            profile_given_name: None,
            profile_family_name: None,
            hide_story: false,
        })
    }

    async fn write(path: &Path, backup_time_ms: u64, recipients: &[(u64, RecipientFrameDetail)]) {
        let mut writer = ArchiveWriter::create(path, &StreamMode::Plaintext)
            .await
            .unwrap();
        writer
            .write_header(&BackupHeader {
                version: FORMAT_VERSION,
                backup_time_ms,
                purpose: BackupPurpose::LocalExport,
            })
            .await
            .unwrap();
        for (id, detail) in recipients {
            let frame = Frame::Recipient(RecipientFrame {
                id: *id,
                detail: detail.clone(),
            });
            writer
                .write_payload(&frame.to_bytes().unwrap())
                .await
                .unwrap();
        }
        writer.finalize().await.unwrap();
    }

    #[tokio::test]
    async fn test_permuted_ids_and_times_render_equal() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.vbk");
        let b = dir.path().join("b.vbk");

        let alice = contact("11111111-1111-1111-1111-111111111111", "+17735550100");
        let bob = contact("22222222-2222-2222-2222-222222222222", "+17735550101");

        // Same logical content: different ids, different emission order,
        // different export time.
        write(&a, 1_000, &[(1, alice.clone()), (2, bob.clone())]).await;
        write(&b, 2_000, &[(7, bob), (9, alice)]).await;

        let mode = StreamMode::Plaintext;
        assert_eq!(
            canonical_form(&a, &mode).await.unwrap(),
            canonical_form(&b, &mode).await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_different_content_renders_different() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.vbk");
        let b = dir.path().join("b.vbk");

        let aci = "11111111-1111-1111-1111-111111111111";
        write(&a, 1_000, &[(1, contact(aci, "+17735550100"))]).await;
        write(&b, 1_000, &[(1, contact(aci, "+17735550199"))]).await;

        let mode = StreamMode::Plaintext;
        assert_ne!(
            canonical_form(&a, &mode).await.unwrap(),
            canonical_form(&b, &mode).await.unwrap()
        );
    }
}
