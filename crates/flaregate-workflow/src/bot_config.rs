// SPDX-FileCopyrightText: 2026 Flaregate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bot configuration recorder.

use flaregate_core::FlareError;
use flaregate_core::types::BotConfiguration;
use tracing::info;

use crate::{Workflow, new_id};

fn required<'a>(field: &str, value: &'a str) -> Result<&'a str, FlareError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(FlareError::Validation(format!("{field} is required")));
    }
    Ok(value)
}

impl Workflow {
    /// Records the game and mode a verified session picked. Earlier
    /// configurations stay as history; the newest one is authoritative.
    pub async fn record_config(
        &self,
        session_id: &str,
        game: &str,
        mode: &str,
        additional_settings: Option<&str>,
    ) -> Result<BotConfiguration, FlareError> {
        let game = required("game", game)?;
        let mode = required("mode", mode)?;
        let session = self.find_session(session_id).await?;
        if !session.verified {
            return Err(FlareError::SessionNotVerified {
                session_id: session_id.to_string(),
            });
        }

        let config = BotConfiguration {
            id: new_id(),
            session_id: session.id,
            game: game.to_string(),
            mode: mode.to_string(),
            additional_settings: additional_settings
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            completed: false,
            created_at: self.now(),
        };
        self.storage.create_bot_config(&config).await?;

        info!(config_id = %config.id, session_id, game, mode, "bot configuration recorded");
        Ok(config)
    }

    pub async fn complete_config(&self, config_id: &str) -> Result<BotConfiguration, FlareError> {
        self.storage
            .complete_bot_config(config_id)
            .await?
            .ok_or_else(|| FlareError::ConfigNotFound {
                config_id: config_id.to_string(),
            })
    }
}
