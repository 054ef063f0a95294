//! Built-in chat commands.
//!
//! | command | aliases | admin |
//! |---------|---------|-------|
//! | help | h, cmds | |
//! | location | where, whereami, loc | |
//! | go | move | |
//! | get / put / del | | yes |
//! | admin+ / admin- | | yes |
//! | id | myid, qmyid | |
//! | look | inspect | |
//! | sit / stand | | |
//! | who | | |
//! | ban / unban | | yes |
//! | resetlocation | resetloc, rsloc | yes |
//! | exit | | yes |

use anyhow::Result;
use async_trait::async_trait;
use log::info;
use serde_json::Value;

use crate::router::registry::{Command, CommandHandler, CommandRouter, Invocation};
use crate::router::say::Say;
use crate::world::navigation::{self, GoOutcome};
use crate::world::WorldError;

const NEED_PARAMETER: &str = "Missed entirely, you need a parameter";

/// Register every built-in command, in listing order.
pub fn register_builtin(router: &mut CommandRouter) {
    router.add_command(Command::new("help", &["help", "h", "cmds"], Help));
    router.add_command(Command::new(
        "location",
        &["location", "where", "whereami", "loc"],
        WhereAmI,
    ));
    router.add_command(Command::new("go", &["go", "move"], Go));
    router.add_command(Command::new("get", &["get"], Get).admin_only());
    router.add_command(Command::new("put", &["put"], Put).admin_only());
    router.add_command(Command::new("del", &["del"], Del).admin_only());
    router.add_command(Command::new("admin+", &["admin+"], AdminAdd).admin_only());
    router.add_command(Command::new("admin-", &["admin-"], AdminRemove).admin_only());
    router.add_command(Command::new("id", &["id", "myid", "qmyid"], MyId));
    router.add_command(Command::new("look", &["look", "inspect"], Look));
    router.add_command(Command::new("sit", &["sit"], Sit));
    router.add_command(Command::new("stand", &["stand"], Stand));
    router.add_command(Command::new("who", &["who"], Who));
    router.add_command(Command::new("ban", &["ban"], Ban).admin_only());
    router.add_command(Command::new("unban", &["unban"], Unban).admin_only());
    router.add_command(
        Command::new(
            "resetlocation",
            &["resetlocation", "resetloc", "rsloc"],
            ResetLocation,
        )
        .admin_only(),
    );
    router.add_command(Command::new("exit", &["exit"], Exit).admin_only());
}

struct Help;

#[async_trait]
impl CommandHandler for Help {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let prefix = inv.msg.prefix_token();
        let sep = match &inv.msg.prefix {
            Some(p) if p.separated => " ",
            _ => "",
        };
        let list = |admin: bool| {
            inv.catalog
                .iter()
                .filter(|c| c.admin == admin)
                .map(|c| format!("{}{}{}", prefix, sep, c.id))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let mut out = format!("Commands: {}", list(false));
        if inv.msg.admin {
            out.push_str(&format!(" | Admin: {}", list(true)));
        }
        Ok(Some(out))
    }
}

struct WhereAmI;

#[async_trait]
impl CommandHandler for WhereAmI {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let loc = inv.ctx.world.get_location(&inv.msg.actor.id).await?;
        Ok(Some(format!("Your current location: {}", loc.name())))
    }
}

struct Go;

#[async_trait]
impl CommandHandler for Go {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let msg = &inv.msg;
        let name = &msg.actor.name;
        let outcome = navigation::go(&inv.ctx.world, &msg.actor.id, &msg.argcat).await?;
        Ok(Some(match outcome {
            GoOutcome::NeedDestination => "Where do you want to go?".to_string(),
            GoOutcome::Sitting => "You can't move because you are sitting.".to_string(),
            GoOutcome::Unknown => navigation::no_map_answer(&msg.argcat),
            GoOutcome::Banned { .. } => format!("My dude {}, you aren't allowed here.", name),
            GoOutcome::AlreadyThere(_) => format!("My dude {}, you're already there, man!", name),
            GoOutcome::Moved(loc) => format!("{} went {}.", name, loc.name()),
        }))
    }
}

struct Get;

#[async_trait]
impl CommandHandler for Get {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let msg = &inv.msg;
        if msg.argcat.is_empty() {
            return Ok(Some(NEED_PARAMETER.to_string()));
        }
        Ok(Some(match inv.ctx.world.raw_get(&msg.argcat).await {
            Ok(value) => format!("Friend {} get SUCCESS: {}", msg.actor.name, value),
            Err(e) => format!("Friend {} get FAIL: {}", msg.actor.name, e),
        }))
    }
}

struct Put;

#[async_trait]
impl CommandHandler for Put {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let msg = &inv.msg;
        let Some(key) = msg.param(0) else {
            return Ok(Some(NEED_PARAMETER.to_string()));
        };
        let raw = msg.rest(1);
        let value = serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        Ok(Some(match inv.ctx.world.raw_put(key, value).await {
            Ok(()) => format!("Friend {} put SUCCESS: `{}`", msg.actor.name, key),
            Err(e) => format!("Friend {} put FAIL: {}", msg.actor.name, e),
        }))
    }
}

struct Del;

#[async_trait]
impl CommandHandler for Del {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let msg = &inv.msg;
        if msg.argcat.is_empty() {
            return Ok(Some(NEED_PARAMETER.to_string()));
        }
        Ok(Some(match inv.ctx.world.raw_delete(&msg.argcat).await {
            Ok(()) => format!("Friend {} del SUCCESS", msg.actor.name),
            Err(e) => format!("Friend {} del FAIL: {}", msg.actor.name, e),
        }))
    }
}

struct AdminAdd;

#[async_trait]
impl CommandHandler for AdminAdd {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let id = &inv.msg.argcat;
        if id.is_empty() {
            return Ok(Some(NEED_PARAMETER.to_string()));
        }
        Ok(Some(if inv.ctx.world.add_admin(id).await? {
            info!(target: "security", "{} granted admin to {}", inv.msg.actor.id, id);
            format!("Added `{}` to admin table.", id)
        } else {
            format!("`{}` is already in the admin table.", id)
        }))
    }
}

struct AdminRemove;

#[async_trait]
impl CommandHandler for AdminRemove {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let id = &inv.msg.argcat;
        if id.is_empty() {
            return Ok(Some(NEED_PARAMETER.to_string()));
        }
        Ok(Some(if inv.ctx.world.remove_admin(id).await? {
            info!(target: "security", "{} revoked admin from {}", inv.msg.actor.id, id);
            format!("Removed `{}` from admin table.", id)
        } else {
            format!("`{}` is not in the admin table.", id)
        }))
    }
}

struct MyId;

#[async_trait]
impl CommandHandler for MyId {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        Ok(Some(format!("Friend {}: `{}`", inv.msg.actor.name, inv.msg.actor.id)))
    }
}

struct Look;

#[async_trait]
impl CommandHandler for Look {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let world = &inv.ctx.world;
        let loc = world.get_location(&inv.msg.actor.id).await?;
        if loc.objects().is_empty() {
            return Ok(Some("There's nothing to look at here.".to_string()));
        }
        let registry = world.objects();
        let mut names = Vec::with_capacity(loc.objects().len());
        for obj in loc.objects() {
            names.push(registry.get_name(&obj.id).await);
        }
        Ok(Some(format!("There's {}... about.", names.join(", "))))
    }
}

struct Sit;

#[async_trait]
impl CommandHandler for Sit {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let world = &inv.ctx.world;
        let actor = &inv.msg.actor;
        let registry = world.objects();
        if let Some(current) = world.sitting_on(&actor.id).await? {
            return Ok(Some(format!(
                "You're already sitting on the {}.",
                registry.get_name(&current).await
            )));
        }

        let wanted = inv.msg.argcat.to_lowercase();
        let loc = world.get_location(&actor.id).await?;
        for placed in loc.objects() {
            let Some(obj) = registry.get(&placed.id).await? else {
                continue;
            };
            let name = obj.display_name().unwrap_or(&obj.id).to_string();
            let named = wanted.is_empty()
                || obj.id.to_lowercase().contains(&wanted)
                || name.to_lowercase().contains(&wanted);
            if named && obj.can_sit() {
                world.set_sitting(&actor.id, &obj.id).await?;
                return Ok(Some(format!("{} sat on the {}.", actor.name, name)));
            }
        }
        Ok(Some("There's nothing to sit on here.".to_string()))
    }
}

struct Stand;

#[async_trait]
impl CommandHandler for Stand {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let world = &inv.ctx.world;
        let actor = &inv.msg.actor;
        if world.sitting_on(&actor.id).await?.is_none() {
            return Ok(Some("You're already standing.".to_string()));
        }
        world.clear_sitting(&actor.id).await?;
        Ok(Some(format!("{} stood up.", actor.name)))
    }
}

struct Who;

#[async_trait]
impl CommandHandler for Who {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let people = inv.ctx.transport.participants().await;
        if people.is_empty() {
            return Ok(Some("Nobody's here.".to_string()));
        }
        let listed: Vec<String> = people
            .iter()
            .map(|p| format!("{} ({})", p.name, crate::logutil::short_id(&p.id)))
            .collect();
        Ok(Some(format!("Here: {}", listed.join(", "))))
    }
}

/// Shared parsing for `ban` / `unban`: `<location> <actor>`.
fn ban_args(inv: &Invocation) -> Option<(&str, &str)> {
    let location = inv.msg.param(0)?;
    let actor = inv.msg.rest(1);
    (!actor.is_empty()).then_some((location, actor))
}

fn missed_location(id: &str) -> String {
    format!("Missed location {} (not in location table) :(", id)
}

struct Ban;

#[async_trait]
impl CommandHandler for Ban {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let Some((location, actor)) = ban_args(inv) else {
            return Ok(Some(NEED_PARAMETER.to_string()));
        };
        Ok(Some(match inv.ctx.world.ban(location, actor).await {
            Ok(true) => format!("Banned `{}` from {}.", actor, location),
            Ok(false) => format!("`{}` is already banned from {}.", actor, location),
            Err(WorldError::NotFound { .. }) => missed_location(location),
            Err(e) => return Err(e.into()),
        }))
    }
}

struct Unban;

#[async_trait]
impl CommandHandler for Unban {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let Some((location, actor)) = ban_args(inv) else {
            return Ok(Some(NEED_PARAMETER.to_string()));
        };
        Ok(Some(match inv.ctx.world.unban(location, actor).await {
            Ok(true) => format!("Unbanned `{}` from {}.", actor, location),
            Ok(false) => format!("`{}` isn't banned from {}.", actor, location),
            Err(WorldError::NotFound { .. }) => missed_location(location),
            Err(e) => return Err(e.into()),
        }))
    }
}

struct ResetLocation;

#[async_trait]
impl CommandHandler for ResetLocation {
    async fn run(&self, inv: &Invocation, _say: &dyn Say) -> Result<Option<String>> {
        let qid = &inv.msg.argcat;
        if qid.is_empty() {
            return Ok(Some(NEED_PARAMETER.to_string()));
        }
        Ok(Some(match inv.ctx.world.reset_location(qid).await {
            Ok(()) => format!("Reset location with id {}", qid),
            Err(WorldError::NotFound { .. }) => missed_location(qid),
            Err(WorldError::NoDefault(_)) => {
                format!("Location {} has no built-in default to reset to.", qid)
            }
            Err(e) => return Err(e.into()),
        }))
    }
}

struct Exit;

#[async_trait]
impl CommandHandler for Exit {
    async fn run(&self, inv: &Invocation, say: &dyn Say) -> Result<Option<String>> {
        say.say("Exiting process...").await;
        info!("exit requested by {}", inv.msg.actor.id);
        inv.ctx.request_shutdown();
        Ok(None)
    }
}
