//! Application service: firewall configuration.

use anyhow::Result;

use crate::application::ports::Firewall;
use crate::domain::{PortRule, ProvisionError};

/// Allow every rule in order, then enable enforcement. The first rejected
/// rule aborts; later rules are not attempted.
///
/// # Errors
///
/// Returns [`ProvisionError::FirewallRule`] naming the rejected rule.
pub async fn configure_firewall(fw: &impl Firewall, rules: &[PortRule]) -> Result<()> {
    for rule in rules {
        let output = fw.allow(rule).await?;
        if !output.status.success() {
            return Err(ProvisionError::FirewallRule {
                rule: rule.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            }
            .into());
        }
        tracing::debug!(%rule, "firewall rule applied");
    }

    let output = fw.enable().await?;
    if !output.status.success() {
        return Err(ProvisionError::FirewallRule {
            rule: "enable".to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        }
        .into());
    }
    Ok(())
}
