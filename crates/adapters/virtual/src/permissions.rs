//! Permission gate that grants everything.

use uhilog_app::ports::PermissionGate;

/// Grants location and Bluetooth access.
///
/// Used by the simulation and on hosts where access is governed by the OS
/// (group membership, capabilities) rather than runtime prompts.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrantAll;

impl PermissionGate for GrantAll {
    async fn location(&self) -> bool {
        true
    }

    async fn bluetooth(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn should_grant_every_permission() {
        assert!(GrantAll.location().await);
        assert!(GrantAll.bluetooth().await);
    }
}
