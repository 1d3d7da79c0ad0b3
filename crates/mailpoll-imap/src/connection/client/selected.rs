//! Message commands, all by UID, and CLOSE.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::{Command, FetchAttribute, SearchCriteria};
use crate::parser::{FetchItem, UntaggedResponse};
use crate::types::{Flag, SeqNum, Uid, UidSet};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// UID SEARCH. UIDs come back in the order the server listed them.
    pub async fn uid_search(&mut self, criteria: &SearchCriteria) -> Result<Vec<Uid>> {
        let data = self
            .execute(&Command::UidSearch {
                criteria: criteria.clone(),
            })
            .await?
            .ok()?;

        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::Search(hits) => Some(hits),
                _ => None,
            })
            .flatten()
            .filter_map(Uid::new)
            .collect())
    }

    /// UID FETCH `items` for `uids`, as (sequence number, items) pairs in
    /// server order. Nothing is sent for an empty set.
    pub async fn uid_fetch(
        &mut self,
        uids: &UidSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<(SeqNum, Vec<FetchItem>)>> {
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let data = self
            .execute(&Command::UidFetch {
                uids: uids.clone(),
                items: items.to_vec(),
            })
            .await?
            .ok()?;

        Ok(data
            .into_iter()
            .filter_map(|item| match item {
                UntaggedResponse::Fetch { seq, items } => Some((seq, items)),
                _ => None,
            })
            .collect())
    }

    /// UID STORE +FLAGS.SILENT. Nothing is sent for an empty set.
    pub async fn uid_store(&mut self, uids: &UidSet, flags: &[Flag]) -> Result<()> {
        if uids.is_empty() {
            return Ok(());
        }

        self.execute(&Command::UidStore {
            uids: uids.clone(),
            flags: flags.to_vec(),
            silent: true,
        })
        .await?
        .ok()
        .map(drop)
    }

    /// CLOSE, back to the authenticated state so another mailbox can be
    /// selected. Messages flagged `\Deleted` are expunged by the server.
    pub async fn close(mut self) -> Result<Client<S, Authenticated>> {
        self.execute(&Command::Close).await?.ok()?;
        Ok(self.transition())
    }
}
