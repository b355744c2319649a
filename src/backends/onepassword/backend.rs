//! 1Password backend implementation.

use crate::backend::ListQuery;
use crate::cli::{check_command_exists, run_command};
use crate::item::{ItemDetail, ItemSummary};
use crate::validation::{escape_field_label, validate_item_id};
use crate::{Backend, Config, ReattachError, Result};
use async_trait::async_trait;
use std::path::Path;

const BACKEND_NAME: &str = "onepassword";

/// 1Password backend.
///
/// Integrates with 1Password via the `op` CLI tool. Sign-in is left to
/// `op` itself (desktop app integration or `OP_SESSION_*` variables).
pub struct OnePasswordBackend {
    op_path: String,
    account: Option<String>,
}

impl OnePasswordBackend {
    /// Creates a new 1Password backend from configuration.
    pub fn new(config: Config) -> Self {
        let account = config
            .get_option("account")
            .filter(|a| !a.is_empty())
            .cloned();

        Self {
            op_path: config.op_path,
            account,
        }
    }

    /// Appends the global flags shared by every invocation.
    fn with_globals<'a>(&'a self, mut args: Vec<&'a str>) -> Vec<&'a str> {
        if let Some(ref account) = self.account {
            args.push("--account");
            args.push(account);
        }
        args
    }

    async fn op(&self, args: Vec<&str>) -> Result<String> {
        let args = self.with_globals(args);
        run_command(&self.op_path, &args, &[])
            .await
            .map_err(classify_error)
    }

    async fn edit(
        &self,
        operation: &str,
        item_id: &str,
        vault_id: &str,
        dry_run: bool,
        tail: Vec<&str>,
    ) -> Result<()> {
        validate_item_id(item_id)?;
        validate_item_id(vault_id)?;

        let mut args = vec!["item", "edit", item_id, "--vault", vault_id];
        if dry_run {
            args.push("--dry-run");
        }
        args.extend(tail);

        self.op(args)
            .await
            .map_err(|e| ReattachError::backend_op(BACKEND_NAME, operation, item_id, e))?;
        Ok(())
    }
}

/// Maps well-known `op` complaints onto typed errors.
fn classify_error(err: ReattachError) -> ReattachError {
    let ReattachError::CommandFailed(msg) = err else {
        return err;
    };

    if msg.contains("isn't an item") || msg.contains("not found") {
        ReattachError::NotFound(msg)
    } else if msg.contains("not currently signed in")
        || msg.contains("not signed in")
        || msg.contains("authorization prompt dismissed")
    {
        ReattachError::NotAuthenticated
    } else {
        ReattachError::CommandFailed(msg)
    }
}

/// Builds the assignment that deletes a field.
fn delete_field_assignment(section: Option<&str>, field_id: &str) -> String {
    match section {
        Some(section) if !section.is_empty() => format!(
            "{}.{}[delete]",
            escape_field_label(section),
            escape_field_label(field_id)
        ),
        _ => format!("{}[delete]", escape_field_label(field_id)),
    }
}

/// Builds the assignment that attaches a file.
fn attach_assignment(label: &str, file: &Path) -> String {
    format!("{}[file]={}", escape_field_label(label), file.display())
}

#[async_trait]
impl Backend for OnePasswordBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    async fn init(&mut self) -> Result<()> {
        if !check_command_exists(&self.op_path).await? {
            return Err(ReattachError::BackendNotInstalled(format!(
                "1Password CLI ({}) is not installed. Install from https://1password.com/downloads/command-line/",
                self.op_path
            )));
        }

        // Verify the CLI runs at all
        run_command(&self.op_path, &["account", "list", "--format=json"], &[]).await?;
        tracing::debug!(op = %self.op_path, "1Password CLI available");

        Ok(())
    }

    async fn list_items(&self, query: &ListQuery) -> Result<Vec<ItemSummary>> {
        let tags = query.tags.join(",");
        let mut args = vec!["item", "list", "--format=json"];
        if query.include_archive {
            args.push("--include-archive");
        }
        if !query.tags.is_empty() {
            args.push("--tags");
            args.push(&tags);
        }

        let output = self
            .op(args)
            .await
            .map_err(|e| ReattachError::backend_op(BACKEND_NAME, "list", "items", e))?;

        let items: Vec<ItemSummary> = serde_json::from_str(&output)
            .map_err(|e| ReattachError::Other(anyhow::anyhow!("Failed to parse items: {}", e)))?;

        tracing::debug!(count = items.len(), include_archive = query.include_archive, "listed items");
        Ok(items)
    }

    async fn get_item(&self, id: &str) -> Result<ItemDetail> {
        validate_item_id(id)?;

        let output = self
            .op(vec!["item", "get", id, "--format=json"])
            .await
            .map_err(|e| match e {
                ReattachError::NotFound(_) => ReattachError::NotFound(id.to_string()),
                e => ReattachError::backend_op(BACKEND_NAME, "get", id, e),
            })?;

        let item: ItemDetail = serde_json::from_str(&output)
            .map_err(|e| ReattachError::Other(anyhow::anyhow!("Failed to parse item {}: {}", id, e)))?;

        Ok(item)
    }

    async fn share_link(&self, id: &str, vault_id: &str) -> Result<String> {
        validate_item_id(id)?;
        validate_item_id(vault_id)?;

        let output = self
            .op(vec!["item", "get", id, "--share-link", "--vault", vault_id])
            .await
            .map_err(|e| ReattachError::backend_op(BACKEND_NAME, "share-link", id, e))?;

        Ok(output.trim().to_string())
    }

    async fn download_document(&self, id: &str, vault_id: &str, out_file: &Path) -> Result<()> {
        validate_item_id(id)?;
        validate_item_id(vault_id)?;

        let out = out_file.to_string_lossy();
        self.op(vec!["document", "get", id, "--vault", vault_id, "--out-file", out.as_ref()])
            .await
            .map_err(|e| ReattachError::backend_op(BACKEND_NAME, "document get", id, e))?;

        Ok(())
    }

    async fn attach_file(
        &mut self,
        item_id: &str,
        vault_id: &str,
        label: &str,
        file: &Path,
        dry_run: bool,
    ) -> Result<()> {
        let assignment = attach_assignment(label, file);
        self.edit("attach", item_id, vault_id, dry_run, vec![assignment.as_str()])
            .await
    }

    async fn set_tags(
        &mut self,
        item_id: &str,
        vault_id: &str,
        tags: &[String],
        dry_run: bool,
    ) -> Result<()> {
        let joined = tags.join(",");
        self.edit("tag", item_id, vault_id, dry_run, vec!["--tags", joined.as_str()])
            .await
    }

    async fn delete_field(
        &mut self,
        item_id: &str,
        vault_id: &str,
        section: Option<&str>,
        field_id: &str,
        dry_run: bool,
    ) -> Result<()> {
        let assignment = delete_field_assignment(section, field_id);
        self.edit("delete field", item_id, vault_id, dry_run, vec![assignment.as_str()])
            .await
    }

    async fn delete_item(&mut self, id: &str, vault_id: &str, archive: bool) -> Result<()> {
        validate_item_id(id)?;
        validate_item_id(vault_id)?;

        let mut args = vec!["item", "delete", id, "--vault", vault_id];
        if archive {
            args.push("--archive");
        }

        self.op(args)
            .await
            .map_err(|e| ReattachError::backend_op(BACKEND_NAME, "delete", id, e))?;

        Ok(())
    }
}
