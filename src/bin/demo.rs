use std::env;
use std::sync::Arc;

use anyhow::Result;
use log::{error, info};
use serenity::async_trait;
use serenity::model::application::interaction::Interaction;
use serenity::model::channel::Message;
use serenity::model::event::MessageUpdateEvent;
use serenity::model::gateway::Ready;
use serenity::prelude::*;

use switchboard::arguments::{ArgumentKind, ArgumentSpec};
use switchboard::hooks::LogHook;
use switchboard::{Command, Framework, FrameworkConfig};

struct Handler {
    framework: Arc<Framework>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if let Err(e) = self.framework.dispatch_message(&ctx, &msg).await {
            error!("Error handling message: {:#}", e);
        }
    }

    async fn message_update(
        &self,
        ctx: Context,
        old: Option<Message>,
        new: Option<Message>,
        _event: MessageUpdateEvent,
    ) {
        if let Err(e) = self.framework.dispatch_message_update(&ctx, old, new).await {
            error!("Error handling message edit: {:#}", e);
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());
        self.framework.note_ready(&ready);

        if let Err(e) = self.framework.register_global(&ctx).await {
            error!("❌ Failed to register application commands: {:#}", e);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::ApplicationCommand(command) = interaction {
            if let Err(e) = self.framework.dispatch_interaction(&ctx, &command).await {
                error!(
                    "Error handling interaction '{}': {:#}",
                    command.data.name, e
                );
            }
        }
    }
}

fn demo_commands() -> Vec<Command> {
    vec![
        Command::new("ping")
            .description("Test bot responsiveness")
            .handler(|mut ctx| async move { ctx.respond("Pong!").await }),
        Command::new("echo")
            .description("Repeat a message back")
            .arg(
                ArgumentSpec::new("text", ArgumentKind::String)
                    .description("What to repeat")
                    .required(true),
            )
            .handler(|mut ctx| async move {
                let text = ctx.args.get_str("text").unwrap_or("...").to_string();
                ctx.respond(text).await
            }),
        Command::new("tag")
            .description("Manage tags")
            .arg(
                ArgumentSpec::new("add", ArgumentKind::SubCommand)
                    .description("Save a tag")
                    .option(
                        ArgumentSpec::new("name", ArgumentKind::String)
                            .description("Tag name")
                            .required(true),
                    ),
            )
            .arg(
                ArgumentSpec::new("get", ArgumentKind::SubCommand)
                    .description("Look a tag up")
                    .option(
                        ArgumentSpec::new("name", ArgumentKind::String)
                            .description("Tag name")
                            .required(true),
                    ),
            )
            .handler(|mut ctx| async move {
                let sub = ctx
                    .args
                    .positional
                    .first()
                    .and_then(|v| v.as_str())
                    .unwrap_or("")
                    .to_string();
                let name = ctx.args.get_str("name").unwrap_or("unnamed").to_string();
                match sub.as_str() {
                    "add" => ctx.respond(format!("Tag `{}` saved.", name)).await,
                    "get" => ctx.respond(format!("Tag `{}` is empty.", name)).await,
                    _ => ctx.respond("Unknown subcommand.").await,
                }
            }),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = FrameworkConfig::from_env()?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting switchboard demo bot...");

    let token = env::var("DISCORD_TOKEN")
        .map_err(|_| anyhow::anyhow!("DISCORD_TOKEN environment variable not set"))?;

    let framework = Arc::new(
        Framework::builder(config)
            .hook(Arc::new(LogHook))
            .commands(demo_commands())
            .build()?,
    );
    let handler = Handler { framework };

    let intents =
        GatewayIntents::GUILDS | GatewayIntents::GUILD_MESSAGES | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {}", e);
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    info!("Connecting to Discord gateway...");
    if let Err(why) = client.start().await {
        error!("Gateway connection failed: {:?}", why);
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    Ok(())
}
