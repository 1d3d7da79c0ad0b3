//! SELECT.

use tokio::io::{AsyncRead, AsyncWrite};

use super::states::{Authenticated, Selected};
use super::{Client, Reply};
use crate::command::Command;
use crate::parser::UntaggedResponse;
use crate::types::{Mailbox, MailboxStatus, ResponseCode, Status};
use crate::Result;

/// What became of a SELECT.
#[derive(Debug)]
pub enum SelectOutcome<S> {
    /// The mailbox is open.
    Selected(Client<S, Selected>, MailboxStatus),
    /// Tagged NO. The connection is still logged in and usable.
    Rejected {
        /// The client, back in the authenticated state.
        client: Client<S, Authenticated>,
        /// Code attached to the NO.
        code: Option<ResponseCode>,
        /// Text of the NO.
        text: String,
    },
}

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// SELECT `mailbox` read-write.
    ///
    /// Only a NO hands the client back. BAD, BYE and transport failures are
    /// errors, since the connection can no longer be trusted.
    pub async fn select(mut self, mailbox: &str) -> Result<SelectOutcome<S>> {
        let reply = self
            .execute(&Command::Select {
                mailbox: Mailbox::new(mailbox),
            })
            .await?;

        if reply.status == Status::No {
            return Ok(SelectOutcome::Rejected {
                client: self,
                code: reply.code,
                text: reply.text,
            });
        }

        let status = reply.select_status();
        reply.ok()?;
        Ok(SelectOutcome::Selected(self.transition(), status))
    }
}

impl Reply {
    /// The tagged code wins over untagged data.
    fn select_status(&self) -> MailboxStatus {
        let mut status = MailboxStatus::default();
        self.data.iter().for_each(|item| apply_data(&mut status, item));
        if let Some(code) = &self.code {
            apply_code(&mut status, code);
        }
        status
    }
}

fn apply_data(status: &mut MailboxStatus, item: &UntaggedResponse) {
    match item {
        UntaggedResponse::Exists(n) => status.exists = *n,
        UntaggedResponse::Recent(n) => status.recent = *n,
        UntaggedResponse::Flags(flags) => status.flags = flags.clone(),
        UntaggedResponse::Status {
            status: Status::Ok,
            code: Some(code),
            ..
        } => apply_code(status, code),
        _ => {}
    }
}

fn apply_code(status: &mut MailboxStatus, code: &ResponseCode) {
    match code {
        ResponseCode::UidNext(uid) => status.uid_next = Some(*uid),
        ResponseCode::UidValidity(validity) => status.uid_validity = Some(*validity),
        ResponseCode::ReadOnly => status.read_only = true,
        ResponseCode::ReadWrite => status.read_only = false,
        _ => {}
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::parser::{Response, ResponseParser};

    fn untagged(line: &[u8]) -> UntaggedResponse {
        match ResponseParser::parse(line).unwrap() {
            Response::Untagged(item) => item,
            other => panic!("not untagged: {other:?}"),
        }
    }

    #[test]
    fn select_data_fills_the_status() {
        let reply = Reply {
            data: vec![
                untagged(b"* 18 EXISTS\r\n"),
                untagged(b"* 2 RECENT\r\n"),
                untagged(b"* FLAGS (\\Seen \\Deleted $Processed)\r\n"),
                untagged(b"* OK [UIDVALIDITY 1741392000] ok\r\n"),
                untagged(b"* OK [UIDNEXT 311] predicted\r\n"),
                untagged(b"* NO [UIDNEXT 999] ignored\r\n"),
            ],
            status: Status::Ok,
            code: Some(ResponseCode::ReadOnly),
            text: "EXAMINE completed".to_string(),
        };
        let status = reply.select_status();

        assert_eq!((status.exists, status.recent), (18, 2));
        assert_eq!(status.flags.len(), 3);
        assert_eq!(status.uid_validity, Some(1_741_392_000));
        assert_eq!(status.uid_next.map(crate::types::Uid::get), Some(311));
        assert!(status.read_only);
    }
}
