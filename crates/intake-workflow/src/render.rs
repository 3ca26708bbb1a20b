//! Rendering of outbox messages.
//!
//! Messages are rendered once, at enqueue time, inside the workflow
//! transaction; the dispatcher delivers them verbatim. `<@id>` is the
//! delivery channel's mention syntax.

use intake_core::types::ActionKind;

fn submission_url(base_url: &str, submission_id: i64) -> String {
    format!("{}/web/submission/{}", base_url, submission_id)
}

fn mention(user_id: i64) -> String {
    format!("<@{}>", user_id)
}

const RULE: &str = "----------------------------------------------------------";

/// Personal notice about an action, mentioning every recipient.
pub fn action_notice(
    base_url: &str,
    author_id: i64,
    submission_id: i64,
    action: ActionKind,
    recipients: &[i64],
) -> String {
    let what = match action {
        ActionKind::Comment => "There is a new comment on the submission.".to_string(),
        ActionKind::Approve => "The submission has been approved.".to_string(),
        ActionKind::RequestChanges => "Changes have been requested on the submission.".to_string(),
        ActionKind::MarkAdded => "The submission has been marked as added.".to_string(),
        ActionKind::Reject => "The submission has been rejected.".to_string(),
        ActionKind::Upload => format!(
            "A new version has been uploaded by {}",
            mention(author_id)
        ),
        other => format!("Action '{}' was taken on the submission.", other),
    };

    let mentions: Vec<String> = recipients.iter().map(|uid| mention(*uid)).collect();

    format!(
        "You have new activity!\n{}\n{}\n{}\n{}\n",
        submission_url(base_url, submission_id),
        what,
        mentions.join(" "),
        RULE
    )
}

/// Public feed announcement for a new or updated upload.
pub fn upload_feed(base_url: &str, uploader_id: i64, submission_id: i64, is_new: bool) -> String {
    let headline = if is_new {
        format!("A new submission has been uploaded by {}", mention(uploader_id))
    } else {
        format!(
            "A submission update has been uploaded by {}",
            mention(uploader_id)
        )
    };

    format!(
        "{}\n{}\n{}\n",
        headline,
        submission_url(base_url, submission_id),
        RULE
    )
}

/// What a deletion notice refers to.
#[derive(Debug, Clone, Copy)]
pub enum DeletedItem {
    Event(i64),
    Artifact(i64),
    Submission,
}

/// Notice to the owner of a soft-deleted item.
pub fn deletion_notice(
    base_url: &str,
    owner_id: i64,
    deleter_id: i64,
    submission_id: i64,
    item: DeletedItem,
    reason: &str,
) -> String {
    let what = match item {
        DeletedItem::Event(id) => {
            format!("Your comment #{} was deleted by {}", id, mention(deleter_id))
        }
        DeletedItem::Artifact(id) => {
            format!("Your file #{} was deleted by {}", id, mention(deleter_id))
        }
        DeletedItem::Submission => format!(
            "Your submission #{} was deleted by {}",
            submission_id,
            mention(deleter_id)
        ),
    };

    format!(
        "You have new activity! {}\n{}\n{}\nReason: {}\n{}\n",
        mention(owner_id),
        submission_url(base_url, submission_id),
        what,
        reason,
        RULE
    )
}
