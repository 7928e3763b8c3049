//! Link management commands.
//!
//! Every command passes the authorization gate first: the invoking user's
//! guild permissions must include manage-channels. Anyone else gets no
//! reply at all, not even a usage hint.

use crate::{ChannelKind, Directory, Identifier, LinkRegistry, PermissionResolver, Permissions};
use coevoice_error::{CommandError, CommandErrorKind, CommandResult};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

const LINK_USAGE: &str = "voicelink <voiceChannelID> <textChannelID|textChannelMention>";
const UNLINK_USAGE: &str = "voiceunlink <voiceChannelID>";

const NO_LINKS: &str = "I know no registered channels for this server.";

/// Chat mention markup for a user.
pub fn user_mention(user_id: &Identifier) -> String {
    format!("<@{}>", user_id)
}

/// A parsed link command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Link a voice channel to a text channel
    Link {
        /// Voice channel to link
        voice: Identifier,
        /// Text channel it grants access to
        text: Identifier,
    },
    /// Remove the link of a voice channel
    Unlink {
        /// Voice channel to unlink
        voice: Identifier,
    },
    /// Show the guild's links
    List,
}

impl Command {
    /// Parse a chat message.
    ///
    /// Returns `None` for messages that are not one of the link commands.
    /// A known command with the wrong number of arguments yields a usage error.
    ///
    /// ```
    /// use coevoice_core::{Command, Identifier};
    ///
    /// let parsed = Command::parse("!", "!VoiceLink 1 <#2>").unwrap().unwrap();
    /// assert_eq!(
    ///     parsed,
    ///     Command::Link { voice: Identifier::from("1"), text: Identifier::from("2") }
    /// );
    /// assert!(Command::parse("!", "!play something").is_none());
    /// ```
    pub fn parse(prefix: &str, content: &str) -> Option<CommandResult<Self>> {
        let rest = content.strip_prefix(prefix)?;
        // The command word must follow the prefix directly.
        if rest.starts_with(char::is_whitespace) {
            return None;
        }
        let mut words = rest.split_whitespace();
        let name = words.next()?.to_lowercase();
        let args: Vec<&str> = words.collect();

        let usage = |form: &str| CommandError::new(CommandErrorKind::Usage(format!("{}{}", prefix, form)));

        let parsed = match name.as_str() {
            "voicelink" => match args.as_slice() {
                [voice, text] => Ok(Self::Link {
                    voice: Identifier::from(*voice),
                    text: Identifier::from(text.trim_matches(|c: char| matches!(c, '<' | '#' | '>'))),
                }),
                _ => Err(usage(LINK_USAGE)),
            },
            "voiceunlink" => match args.as_slice() {
                [voice] => Ok(Self::Unlink {
                    voice: Identifier::from(*voice),
                }),
                _ => Err(usage(UNLINK_USAGE)),
            },
            "voicelinklist" => Ok(Self::List),
            _ => return None,
        };
        Some(parsed)
    }
}

/// Who issued a command, and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Channel the message was posted in
    pub channel_id: Identifier,
    /// Author of the message
    pub user_id: Identifier,
}

/// Result of handling a chat message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    /// Text to post back in the invoking channel
    pub reply: Option<String>,
    /// Guild whose link table changed and needs reconciling
    pub changed_guild: Option<Identifier>,
    /// Text channel that lost its link
    pub released: Option<Identifier>,
}

impl CommandOutcome {
    fn silent() -> Self {
        Self::default()
    }

    fn reply(text: String) -> Self {
        Self {
            reply: Some(text),
            ..Self::default()
        }
    }

    fn changed(text: String, guild_id: Identifier) -> Self {
        Self {
            reply: Some(text),
            changed_guild: Some(guild_id),
            released: None,
        }
    }
}

/// Executes link commands against the registry.
pub struct CommandService {
    prefix: String,
    registry: Arc<LinkRegistry>,
    directory: Arc<dyn Directory>,
    resolver: PermissionResolver,
}

impl CommandService {
    /// Create a service recognizing commands that start with `prefix`.
    pub fn new(prefix: impl Into<String>, registry: Arc<LinkRegistry>, directory: Arc<dyn Directory>) -> Self {
        Self {
            prefix: prefix.into(),
            registry,
            resolver: PermissionResolver::new(Arc::clone(&directory)),
            directory,
        }
    }

    /// Handle one chat message.
    #[instrument(skip_all, fields(channel_id = %invocation.channel_id, user_id = %invocation.user_id))]
    pub async fn handle(&self, invocation: &Invocation, content: &str) -> CommandOutcome {
        let Some(parsed) = Command::parse(&self.prefix, content) else {
            return CommandOutcome::silent();
        };

        let guild_id = match self.authorize(invocation).await {
            Ok(guild_id) => guild_id,
            Err(e) => {
                debug!(error = %e, "Ignoring command");
                return CommandOutcome::silent();
            }
        };

        let mention = user_mention(&invocation.user_id);
        let command = match parsed {
            Ok(command) => command,
            Err(CommandError {
                kind: CommandErrorKind::Usage(usage),
                ..
            }) => {
                return CommandOutcome::reply(format!(
                    "{} Usage of this command:\n```\n{}\n```",
                    mention, usage
                ));
            }
            Err(e) => {
                debug!(error = %e, "Ignoring command");
                return CommandOutcome::silent();
            }
        };

        match command {
            Command::Link { voice, text } => self.link(&mention, guild_id, &voice, &text).await,
            Command::Unlink { voice } => self.unlink(&mention, guild_id, &voice),
            Command::List => self.list(&mention, &guild_id).await,
        }
    }

    /// Resolve the invoking guild and require manage-channels there.
    ///
    /// Lookup failures deny.
    async fn authorize(&self, invocation: &Invocation) -> CommandResult<Identifier> {
        let unauthorized =
            || CommandError::new(CommandErrorKind::Unauthorized(invocation.user_id.to_string()));

        let channel = self.directory.channel(&invocation.channel_id).await.map_err(|e| {
            warn!(error = %e, "Could not resolve invoking channel");
            unauthorized()
        })?;

        let permissions = self
            .resolver
            .guild_permissions(&channel.guild_id, &invocation.user_id)
            .await
            .map_err(|e| {
                warn!(error = %e, "Could not resolve invoking member permissions");
                unauthorized()
            })?;

        if !permissions.contains(Permissions::MANAGE_CHANNELS) {
            return Err(unauthorized());
        }
        Ok(channel.guild_id)
    }

    async fn link(
        &self,
        mention: &str,
        guild_id: Identifier,
        voice_id: &Identifier,
        text_id: &Identifier,
    ) -> CommandOutcome {
        let Ok(voice) = self.directory.channel(voice_id).await else {
            return CommandOutcome::reply(format!(
                "{} I'm sorry, I could not find that voice channel.",
                mention
            ));
        };
        let Ok(text) = self.directory.channel(text_id).await else {
            return CommandOutcome::reply(format!(
                "{} I'm sorry, I could not find that text channel.",
                mention
            ));
        };

        if voice.kind != ChannelKind::Voice || text.kind != ChannelKind::Text {
            return CommandOutcome::reply(format!(
                "{} The first argument needs to be a voice channel, the second argument needs to be a text channel.",
                mention
            ));
        }

        if voice.guild_id != guild_id || text.guild_id != guild_id {
            return CommandOutcome::reply(format!(
                "{} The channels provided both need to be in the same server as where you execute the command.",
                mention
            ));
        }

        let previous = self.registry.put(guild_id.clone(), voice.id.clone(), text.id.clone());
        info!(voice = %voice.id, text = %text.id, "Link created by command");

        let mut outcome = CommandOutcome::changed(
            format!(
                "{} Success! I've linked the voice channel {} to the text channel {}.",
                mention,
                voice.name,
                text.mention()
            ),
            guild_id,
        );
        outcome.released = previous.filter(|previous| previous != &text.id);
        outcome
    }

    fn unlink(&self, mention: &str, guild_id: Identifier, voice_id: &Identifier) -> CommandOutcome {
        if !self.registry.has_guild(&guild_id) {
            return CommandOutcome::reply(format!("{} {}", mention, NO_LINKS));
        }

        let text_id = self.registry.get(&guild_id).get(voice_id).cloned();
        if !self.registry.remove(&guild_id, voice_id) {
            return CommandOutcome::reply(format!(
                "{} That is not a registered voice channel in this server.",
                mention
            ));
        }

        let mut outcome = CommandOutcome::changed(
            format!("{} Success! I've unlinked that voice channel!", mention),
            guild_id,
        );
        outcome.released = text_id;
        outcome
    }

    /// Links whose endpoints no longer resolve are left out of the listing.
    async fn list(&self, mention: &str, guild_id: &Identifier) -> CommandOutcome {
        let links = self.registry.get(guild_id);

        let mut lines = Vec::with_capacity(links.len());
        for (voice_id, text_id) in &links {
            let (Ok(voice), Ok(text)) = (
                self.directory.channel(voice_id).await,
                self.directory.channel(text_id).await,
            ) else {
                debug!(voice = %voice_id, text = %text_id, "Skipping unresolvable link");
                continue;
            };
            lines.push(format!(
                "\nThe voice channel \"{}\" ({}) is linked to {} ({}).",
                voice.name,
                voice.id,
                text.mention(),
                text.id
            ));
        }

        if lines.is_empty() {
            return CommandOutcome::reply(format!("{} {}", mention, NO_LINKS));
        }

        CommandOutcome::reply(format!(
            "{} These are the voice channels I have currently linked to text channels:\n{}",
            mention,
            lines.concat()
        ))
    }
}
