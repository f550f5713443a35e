use std::path::PathBuf;

use lightdeck::config::CardConfig;
use lightdeck::config::LogLevel;
use lightdeck::engine::Card;
use lightdeck::engine::OutboundQueue;
use lightdeck::engine::ServiceAction;
use lightdeck::script::load_snapshot;
use lightdeck::script::Session;

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

fn demo_card() -> Card<OutboundQueue> {
    let (config, warnings) = CardConfig::from_file(demo("card.toml")).unwrap();
    assert!(warnings.is_empty(), "unexpected warnings: {:?}", warnings);
    Card::new(config, OutboundQueue::new())
}

#[test]
fn test_demo_config_loads() {
    let card = demo_card();
    let config = card.config();
    assert_eq!(config.groups.len(), 3);
    assert_eq!(config.groups[2].entity, None);
    assert_eq!(
        config.logging.overrides.get("lightdeck::engine"),
        Some(&LogLevel::Debug)
    );
    assert_eq!(card.card_size(), 12);
}

#[test]
fn test_demo_render() {
    let mut card = demo_card();
    card.push_state(load_snapshot(demo("states.json")).unwrap());

    let rows = card.rows();
    let summary: Vec<_> = rows
        .iter()
        .map(|r| (r.name.as_str(), r.percent, r.chevron, r.lux.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("Kitchen", 100, true, Some("212 lx")),
            ("Desk", 0, false, None),
            ("Garden", 50, true, None),
        ]
    );
}

#[test]
fn test_demo_session() {
    let mut card = demo_card();
    let session = Session::from_file(demo("session.json")).unwrap();
    let frames = session.run(&mut card);
    assert_eq!(frames.len(), session.steps.len());

    let actions: Vec<_> = card.service().calls().map(|c| c.action()).collect();
    assert_eq!(
        actions,
        vec![
            ServiceAction::TurnOn,
            ServiceAction::TurnOn,
            ServiceAction::TurnOn,
        ]
    );
    assert_eq!(card.service().notifications().count(), 1);
}
