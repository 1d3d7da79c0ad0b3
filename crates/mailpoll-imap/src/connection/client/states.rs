//! Zero-sized markers for the `State` parameter of [`Client`](super::Client).

/// Connected, greeting read, not logged in.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Logged in, no mailbox open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// A mailbox is open.
#[derive(Debug, Clone, Copy, Default)]
pub struct Selected;

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Authenticated {}
    impl Sealed for super::Selected {}
}

/// Logged-in states, where LIST is allowed.
pub trait MailboxAccess: sealed::Sealed {}

impl MailboxAccess for Authenticated {}
impl MailboxAccess for Selected {}
