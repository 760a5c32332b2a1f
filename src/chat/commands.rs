//! Chat command grammar: a registry table driving the help text plus a
//! parser that turns one prefixed message into a typed [`Command`]. Parsing
//! is strict about arity but forgiving about case and spacing; item and
//! location arguments are normalized to catalog form.

use uuid::Uuid;

use crate::rpg::engine::LeaderboardKind;
use crate::validation::{normalize_id, parse_amount, parse_quantity};

/// Gathering actions share one verb list so the parser and help stay in sync
/// with the catalog's action tables.
pub const ACTION_VERBS: &[&str] = &["hunt", "mine", "fish", "chop", "explore", "train"];

/// One entry of the command registry.
pub struct CommandSpec {
    pub verb: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        verb: "register",
        usage: "register [name]",
        description: "create your character",
    },
    CommandSpec {
        verb: "profile",
        usage: "profile",
        description: "level, exp, money and stats",
    },
    CommandSpec {
        verb: "race",
        usage: "race",
        description: "your race, bonuses and next tier",
    },
    CommandSpec {
        verb: "inv",
        usage: "inv",
        description: "show your inventory",
    },
    CommandSpec {
        verb: "equip",
        usage: "equip <category> <item>",
        description: "equip a weapon, armor or accessory",
    },
    CommandSpec {
        verb: "unequip",
        usage: "unequip <category>",
        description: "clear an equipment slot",
    },
    CommandSpec {
        verb: "use",
        usage: "use <category> <item> [qty]",
        description: "consume a potion, food or drink",
    },
    CommandSpec {
        verb: "hunt",
        usage: "hunt | mine | fish | chop | explore | train",
        description: "timed gathering actions",
    },
    CommandSpec {
        verb: "daily",
        usage: "daily",
        description: "claim the daily reward",
    },
    CommandSpec {
        verb: "open",
        usage: "open <box>",
        description: "open a loot box you hold",
    },
    CommandSpec {
        verb: "battle",
        usage: "battle <monster>",
        description: "fight a monster",
    },
    CommandSpec {
        verb: "duel",
        usage: "duel <player> <bet>",
        description: "duel another player for money",
    },
    CommandSpec {
        verb: "gamble",
        usage: "gamble <bet>",
        description: "coin-flip your money",
    },
    CommandSpec {
        verb: "buy",
        usage: "buy <category> <item> [qty]",
        description: "buy from the shop",
    },
    CommandSpec {
        verb: "sell",
        usage: "sell <category> <item> [qty]",
        description: "sell to the shop",
    },
    CommandSpec {
        verb: "craft",
        usage: "craft <recipe>",
        description: "craft from materials",
    },
    CommandSpec {
        verb: "recipes",
        usage: "recipes",
        description: "list known recipes",
    },
    CommandSpec {
        verb: "travel",
        usage: "travel <location>",
        description: "move to another location",
    },
    CommandSpec {
        verb: "market",
        usage: "market [sell <cat> <item> <qty> <price> | buy <id>]",
        description: "player market",
    },
    CommandSpec {
        verb: "guild",
        usage: "guild [create <name> | join <name>]",
        description: "guilds",
    },
    CommandSpec {
        verb: "top",
        usage: "top [level|money|combat]",
        description: "leaderboard",
    },
    CommandSpec {
        verb: "cooldowns",
        usage: "cooldowns",
        description: "your pending cooldowns",
    },
    CommandSpec {
        verb: "help",
        usage: "help",
        description: "this list",
    },
];

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Register { name: Option<String> },
    Profile,
    Race,
    Inventory,
    Equip { category: String, item: String },
    Unequip { category: String },
    Use { category: String, item: String, quantity: u32 },
    Action { name: String },
    Daily,
    OpenBox { box_id: String },
    Battle { monster: String },
    Duel { opponent: String, bet: i64 },
    Gamble { bet: i64 },
    Buy { category: String, item: String, quantity: u32 },
    Sell { category: String, item: String, quantity: u32 },
    Craft { recipe: String },
    Recipes,
    Travel { destination: String },
    Market,
    MarketSell { category: String, item: String, quantity: u32, unit_price: i64 },
    MarketBuy { listing: Uuid },
    GuildInfo,
    GuildCreate { name: String },
    GuildJoin { name: String },
    Top { kind: LeaderboardKind },
    Cooldowns,
    Help,
}

/// Parse one message body. `None` means the message is not addressed to the
/// bot at all; `Some(Err(_))` is a player-facing usage error.
pub fn parse(prefix: &str, body: &str) -> Option<Result<Command, String>> {
    let body = body.trim();
    let rest = body.strip_prefix(prefix)?;
    let mut words = rest.split_whitespace();
    let verb = words.next()?.to_lowercase();
    let args: Vec<&str> = words.collect();
    Some(parse_verb(&verb, &args))
}

fn usage_of(verb: &str) -> String {
    COMMANDS
        .iter()
        .find(|c| c.verb == verb)
        .map(|c| format!("usage: {}", c.usage))
        .unwrap_or_else(|| format!("unknown command: {} (try help)", verb))
}

fn parse_verb(verb: &str, args: &[&str]) -> Result<Command, String> {
    if ACTION_VERBS.contains(&verb) {
        return if args.is_empty() {
            Ok(Command::Action {
                name: verb.to_string(),
            })
        } else {
            Err(usage_of("hunt"))
        };
    }
    match verb {
        "register" => Ok(Command::Register {
            name: (!args.is_empty()).then(|| args.join(" ")),
        }),
        "profile" | "stats" => expect_none(args, Command::Profile, "profile"),
        "race" => expect_none(args, Command::Race, "race"),
        "inv" | "inventory" => expect_none(args, Command::Inventory, "inv"),
        "equip" => match args {
            [category, item @ ..] if !item.is_empty() => Ok(Command::Equip {
                category: normalize_id(category),
                item: normalize_id(&item.join(" ")),
            }),
            _ => Err(usage_of("equip")),
        },
        "unequip" => match args {
            [category] => Ok(Command::Unequip {
                category: normalize_id(category),
            }),
            _ => Err(usage_of("unequip")),
        },
        "use" => parse_item_with_qty(args, "use")
            .map(|(category, item, quantity)| Command::Use {
                category,
                item,
                quantity,
            }),
        "daily" => expect_none(args, Command::Daily, "daily"),
        "open" => match args {
            [box_id] => Ok(Command::OpenBox {
                box_id: normalize_id(box_id),
            }),
            _ => Err(usage_of("open")),
        },
        "battle" | "fight" => match args {
            [monster] => Ok(Command::Battle {
                monster: normalize_id(monster),
            }),
            _ => Err(usage_of("battle")),
        },
        "duel" => match args {
            [opponent, bet] => Ok(Command::Duel {
                opponent: opponent.to_string(),
                bet: parse_amount(bet)?,
            }),
            _ => Err(usage_of("duel")),
        },
        "gamble" => match args {
            [bet] => Ok(Command::Gamble {
                bet: parse_amount(bet)?,
            }),
            _ => Err(usage_of("gamble")),
        },
        "buy" => parse_item_with_qty(args, "buy").map(|(category, item, quantity)| Command::Buy {
            category,
            item,
            quantity,
        }),
        "sell" => parse_item_with_qty(args, "sell")
            .map(|(category, item, quantity)| Command::Sell {
                category,
                item,
                quantity,
            }),
        "craft" => match args {
            [recipe] => Ok(Command::Craft {
                recipe: normalize_id(recipe),
            }),
            _ => Err(usage_of("craft")),
        },
        "recipes" => expect_none(args, Command::Recipes, "recipes"),
        "travel" => match args {
            [destination] => Ok(Command::Travel {
                destination: normalize_id(destination),
            }),
            _ => Err(usage_of("travel")),
        },
        "market" => match args {
            [] => Ok(Command::Market),
            ["sell", category, item, qty, price] => Ok(Command::MarketSell {
                category: normalize_id(category),
                item: normalize_id(item),
                quantity: parse_quantity(qty)?,
                unit_price: parse_amount(price)?,
            }),
            ["buy", id] => id
                .parse::<Uuid>()
                .map(|listing| Command::MarketBuy { listing })
                .map_err(|_| format!("not a listing id: {}", id)),
            _ => Err(usage_of("market")),
        },
        "guild" => match args {
            [] => Ok(Command::GuildInfo),
            ["create", name @ ..] if !name.is_empty() => Ok(Command::GuildCreate {
                name: name.join(" "),
            }),
            ["join", name @ ..] if !name.is_empty() => Ok(Command::GuildJoin {
                name: name.join(" "),
            }),
            _ => Err(usage_of("guild")),
        },
        "top" | "leaderboard" => match args {
            [] => Ok(Command::Top {
                kind: LeaderboardKind::Level,
            }),
            [kind] => kind
                .parse::<LeaderboardKind>()
                .map(|kind| Command::Top { kind })
                .map_err(|e| e.to_string()),
            _ => Err(usage_of("top")),
        },
        "cooldowns" | "cd" => expect_none(args, Command::Cooldowns, "cooldowns"),
        "help" => Ok(Command::Help),
        other => Err(usage_of(other)),
    }
}

fn expect_none(args: &[&str], command: Command, verb: &str) -> Result<Command, String> {
    if args.is_empty() {
        Ok(command)
    } else {
        Err(usage_of(verb))
    }
}

fn parse_item_with_qty(args: &[&str], verb: &str) -> Result<(String, String, u32), String> {
    match args {
        [category, item] => Ok((normalize_id(category), normalize_id(item), 1)),
        [category, item, qty] => Ok((
            normalize_id(category),
            normalize_id(item),
            parse_quantity(qty)?,
        )),
        _ => Err(usage_of(verb)),
    }
}

/// Render the help reply from the registry.
pub fn help_text(prefix: &str) -> String {
    let mut out = String::from("Commands:\n");
    for spec in COMMANDS {
        out.push_str(&format!("{}{} - {}\n", prefix, spec.usage, spec.description));
    }
    out.trim_end().to_string()
}
