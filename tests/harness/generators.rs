// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for abuse simulation.

use super::attacks::PayloadKind;
use serde_json::json;
use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of client addresses for testing.
pub fn generate_ips(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c)).to_string()
        })
        .collect()
}

/// User-Agent strings sent by the game client.
pub fn genuine_user_agents() -> Vec<&'static str> {
    vec![
        "Roblox/WinInet",
        "Roblox/Linux",
        "RobloxStudio/WinInet",
        "Mozilla/5.0 (Windows NT 10.0) Roblox/WinInet",
    ]
}

/// User-Agent strings that must not pass the origin check.
pub fn spoofed_user_agents() -> Vec<Option<&'static str>> {
    vec![
        None,
        Some(""),
        Some("curl/8.4.0"),
        Some("python-requests/2.31.0"),
        Some("Mozilla/5.0 (X11; Linux x86_64)"),
        Some("roblox/wininet"), // Case variation
        Some("R0blox/WinInet"),
        Some("Rob lox"),
    ]
}

/// Generate a JSON payload of the given kind.
pub fn generate_payload(kind: PayloadKind, index: usize) -> String {
    let game = format!("https://www.roblox.com/games/{}", 1_000 + index);
    match kind {
        PayloadKind::Valid => json!({
            "content": format!("Server #{index} is looking for players"),
            "embeds": [{"title": "Join", "url": game}],
        })
        .to_string(),
        PayloadKind::InviteLink => json!({
            "content": format!("Better server at discord.gg/spam{index}"),
            "embeds": [{"title": "Join", "url": game}],
        })
        .to_string(),
        PayloadKind::BroadcastMention => json!({
            "content": format!("@everyone server #{index} is up"),
            "embeds": [{"title": "Join", "url": game}],
        })
        .to_string(),
        PayloadKind::MissingReference => json!({
            "content": format!("Buy cheap currency, offer #{index}"),
            "embeds": [{"title": "Shop", "url": "https://example.com/shop"}],
        })
        .to_string(),
        PayloadKind::Malformed => format!("{{\"content\": \"unterminated #{index}"),
    }
}

/// Ways to hide an invite link that the policy must still catch.
pub fn obfuscated_invites() -> Vec<&'static str> {
    vec![
        "discord.gg/abc",
        "DISCORD.GG/abc",
        "Discord.Gg/abc",
        "https://discord.gg/abc?event=1",
        "join:discord.gg/x",
    ]
}
