//! Prompt assembly.
//!
//! Two prompts per planning call: a system prompt describing the output
//! contract, the reference catalog and few-shot examples, and a user prompt
//! carrying the live world snapshot plus the player's command. The system
//! prompt embeds the current template list, so it is rebuilt per call rather
//! than cached.

use crate::catalog::{self, TemplateStore};
use crate::types::WorldSnapshot;

/// System prompt: output format contract, catalog contents and examples.
pub fn build_system_prompt(templates: &dyn TemplateStore) -> String {
    let template_list = catalog::format_list(&templates.available_structures());
    let procedural_list = catalog::format_list(catalog::PROCEDURAL_STRUCTURES);

    format!(
        r#"You are a Minecraft AI agent. Respond ONLY with valid JSON, no extra text.

FORMAT (strict JSON):
{{"reasoning": "brief thought", "plan": "action description", "tasks": [{{"action": "type", "parameters": {{...}}}}]}}

AVAILABLE ENTITIES:
- Passive: {passive}
- Hostile: {hostile}
- Ores: {ores}

STRUCTURES (from the template directory):
{templates}

PROCEDURAL STRUCTURES:
{procedural}

ORE SPAWN LEVELS:
- diamond_ore: y < 16
- iron_ore: y < 64
- coal_ore: any level

ACTIONS:
- attack: {{"target": "sheep|cow|zombie|hostile", "quantity": 1}}
- build: {{"structure": "STRUCTURE_NAME", "blocks": ["oak_planks", "cobblestone", "glass_pane"], "dimensions": [9, 6, 9]}}
- mine: {{"block": "diamond_ore", "quantity": 8}}
- craft: {{"item": "stone_pickaxe", "quantity": 1}}
- gather: {{"resource": "oak_log", "quantity": 16}}
- place: {{"block": "torch", "x": 0, "y": 64, "z": 0}}
- follow: {{"player": "NAME"}}
- pathfind: {{"x": 0, "y": 0, "z": 0}}

RULES:
1. Use specific entity names for attack targets; use "hostile" only for all hostiles.
2. ONLY use structure names listed above (templates or procedural).
3. Use 2-3 block types: oak_planks, cobblestone, glass_pane, stone_bricks.
4. NO extra pathfind tasks unless explicitly requested.
5. Keep reasoning under 15 words.
6. MINING: Use ore IDs from the list above.

EXAMPLES (copy these formats exactly):

Command: "kill 5 sheep"
{{"reasoning": "Need sheep cleared", "plan": "Attack sheep", "tasks": [{{"action": "attack", "parameters": {{"target": "sheep", "quantity": 5}}}}]}}

Command: "mine diamonds"
{{"reasoning": "Collect diamond ore", "plan": "Mine diamonds", "tasks": [{{"action": "mine", "parameters": {{"block": "diamond_ore", "quantity": 10}}}}]}}

Command: "build a house"
{{"reasoning": "Build a basic house", "plan": "Construct house", "tasks": [{{"action": "build", "parameters": {{"structure": "house", "blocks": ["oak_planks", "cobblestone", "glass_pane"], "dimensions": [5, 5, 5]}}}}]}}

CRITICAL: Output ONLY valid JSON. No markdown, no explanations, no line breaks in JSON."#,
        passive = catalog::PASSIVE_ENTITIES.join(", "),
        hostile = catalog::HOSTILE_ENTITIES.join(", "),
        ores = catalog::ORES.join(", "),
        templates = template_list,
        procedural = procedural_list,
    )
}

/// User prompt: situational snapshot plus the verbatim command.
pub fn build_user_prompt(command: &str, snapshot: &WorldSnapshot) -> String {
    let (x, y, z) = snapshot.position;
    format!(
        "=== YOUR SITUATION ===\n\
         Position: [{x}, {y}, {z}]\n\
         Nearby Players: {players}\n\
         Nearby Entities: {entities}\n\
         Nearby Blocks: {blocks}\n\
         Biome: {biome}\n\
         \n\
         === PLAYER COMMAND ===\n\
         \"{command}\"\n\
         \n\
         === YOUR RESPONSE (with reasoning) ===\n",
        players = snapshot.nearby_players,
        entities = snapshot.nearby_entities,
        blocks = snapshot.nearby_blocks,
        biome = snapshot.biome,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FsTemplateStore;

    fn snapshot() -> WorldSnapshot {
        WorldSnapshot {
            position: (12, 64, -7),
            nearby_players: "Alex (8 blocks)".to_string(),
            nearby_entities: "2 sheep, 1 zombie".to_string(),
            nearby_blocks: "oak_log, stone".to_string(),
            biome: "plains".to_string(),
        }
    }

    #[test]
    fn system_prompt_lists_catalog_and_templates() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("pyramid.nbt"), b"").unwrap();
        let store = FsTemplateStore::new(dir.path());

        let prompt = build_system_prompt(&store);
        assert!(prompt.contains("sheep, cow, pig, chicken"));
        assert!(prompt.contains("zombie, skeleton, spider, creeper"));
        assert!(prompt.contains("diamond_ore"));
        assert!(prompt.contains("- pyramid"));
        assert!(prompt.contains("- castle"));
        assert!(prompt.contains("diamond_ore: y < 16"));
    }

    #[test]
    fn system_prompt_marks_empty_template_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsTemplateStore::new(dir.path());

        let prompt = build_system_prompt(&store);
        assert!(prompt.contains("- none found"));
    }

    #[test]
    fn user_prompt_quotes_command_and_embeds_snapshot() {
        let prompt = build_user_prompt("mine 5 iron", &snapshot());
        assert!(prompt.contains("Position: [12, 64, -7]"));
        assert!(prompt.contains("Nearby Players: Alex (8 blocks)"));
        assert!(prompt.contains("Biome: plains"));
        assert!(prompt.contains("\"mine 5 iron\""));
        assert!(prompt.starts_with("=== YOUR SITUATION ==="));
    }
}
