//! Travel between locations (`go` / `move`).
//!
//! Destination matching is a case-insensitive substring test against a
//! location's id, display name and aliases. Candidates outside the
//! caller's world partition are skipped when both sides name a world.
//! When several candidates match, the one latest in table order wins.

use log::debug;
use rand::Rng;

use crate::world::errors::WorldError;
use crate::world::model::WorldModel;
use crate::world::types::Location;

/// What a `go` request resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum GoOutcome {
    /// Empty destination.
    NeedDestination,
    /// The caller is sitting; nothing changed.
    Sitting,
    /// No location matched the destination text.
    Unknown,
    /// The destination bans the caller. `relocated` is true when they were
    /// standing in it and got moved to the default location.
    Banned { relocated: bool },
    AlreadyThere(Location),
    Moved(Location),
}

/// Pick the destination for `query` among `table`, seen from `current`.
pub fn find_destination<'a>(
    table: &'a [Location],
    current: &Location,
    query: &str,
) -> Option<&'a Location> {
    let go = query.to_lowercase();
    let mut found = None;
    for loc in table {
        if let (Some(here), Some(there)) = (&current.world, &loc.world) {
            if here != there {
                continue;
            }
        }
        let alias_hit = loc.aliases().iter().any(|a| a.to_lowercase().contains(&go));
        let hit = alias_hit
            || loc.id.to_lowercase().contains(&go)
            || loc
                .display_name
                .as_ref()
                .is_some_and(|n| n.to_lowercase().contains(&go));
        if hit {
            found = Some(loc);
        }
    }
    found
}

/// The four replies for a destination that is not on the map.
pub fn no_map_answers(query: &str) -> [String; 4] {
    [
        format!("I don't see \"{}\" on the map.", query),
        format!("There's no \"{}\" in this world.", query),
        format!(
            "You stare at the map for hours, only to find no location called \"{}\".",
            query
        ),
        format!("You decided not to go to \"{}\".", query),
    ]
}

/// One of [`no_map_answers`], chosen uniformly.
pub fn no_map_answer(query: &str) -> String {
    let answers = no_map_answers(query);
    let idx = rand::thread_rng().gen_range(0..answers.len());
    answers[idx].clone()
}

/// Resolve and apply a travel request for `actor_id`.
pub async fn go(world: &WorldModel, actor_id: &str, destination: &str) -> Result<GoOutcome, WorldError> {
    let destination = destination.trim();
    if destination.is_empty() {
        return Ok(GoOutcome::NeedDestination);
    }
    if world.sitting_on(actor_id).await?.is_some() {
        return Ok(GoOutcome::Sitting);
    }

    let current = world.get_location(actor_id).await?;
    let table = world.locations().await?;
    let Some(target) = find_destination(&table, &current, destination) else {
        return Ok(GoOutcome::Unknown);
    };

    if target.is_banned(actor_id) {
        let relocated = current.id == target.id;
        if relocated {
            world.set_location(actor_id, world.default_location_id()).await?;
        }
        debug!("{} refused entry to '{}' (relocated={})", actor_id, target.id, relocated);
        return Ok(GoOutcome::Banned { relocated });
    }

    if current.id == target.id {
        return Ok(GoOutcome::AlreadyThere(target.clone()));
    }

    world.set_location(actor_id, &target.id).await?;
    debug!("{} moved '{}' -> '{}'", actor_id, current.id, target.id);
    Ok(GoOutcome::Moved(target.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn loc(raw: serde_json::Value) -> Location {
        serde_json::from_value(raw).expect("location")
    }

    fn table() -> Vec<Location> {
        vec![
            loc(json!({"id": "home", "displayName": "Home", "aliases": ["inside", "in"], "world": "Earth"})),
            loc(json!({"id": "outside", "displayName": "Outside", "aliases": ["out"], "world": "Earth"})),
            loc(json!({"id": "crater", "displayName": "Crater", "world": "Moon"})),
        ]
    }

    #[test]
    fn matches_alias_and_display_name_case_insensitively() {
        let t = table();
        assert_eq!(find_destination(&t, &t[0], "OUTSIDE").map(|l| l.id.as_str()), Some("outside"));
        assert_eq!(find_destination(&t, &t[1], "Inside").map(|l| l.id.as_str()), Some("home"));
    }

    #[test]
    fn last_match_wins() {
        let t = table();
        // "o" hits both home and outside; outside comes later
        assert_eq!(find_destination(&t, &t[0], "o").map(|l| l.id.as_str()), Some("outside"));
    }

    #[test]
    fn other_worlds_are_unreachable() {
        let t = table();
        assert!(find_destination(&t, &t[0], "crater").is_none());
        assert_eq!(
            find_destination(&t, &Location::void(), "crater").map(|l| l.id.as_str()),
            Some("crater")
        );
    }

    #[test]
    fn no_map_answer_is_one_of_four() {
        let answers = no_map_answers("nowhereville");
        for _ in 0..50 {
            assert!(answers.contains(&no_map_answer("nowhereville")));
        }
    }
}
