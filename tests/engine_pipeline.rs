//! End-to-end tests of the protocol engine: bytes in, state and commands out

use scpilot_core::{
    Catalog, ChannelAliases, ChannelLabels, CommandOptions, CommandPrefix, CommandValue,
    ConsoleFamily, EngineEvent, FeedbackRequest, FeedbackState, MacroSignal, ScpEngine, Value,
};
use std::sync::Arc;

const CL_CATALOG: &str = "\
OK prminfo 0 \"MIXER:Current/InCh/Fader/Level\" 72 1 -32768 1000 -32768 \"dB\" integer any rw 100
OK prminfo 1 \"MIXER:Current/InCh/Fader/On\" 72 1 0 1 1 \"\" integer any rw 1
OK prminfo 2 \"MIXER:Current/InCh/Label/Name\" 72 1 0 8 \"\" \"\" string any rw 1
OK prminfo 3 \"MIXER:Current/InCh/ToMix/Level\" 72 24 -32768 1000 -32768 \"dB\" integer any rw 100
OK scninfo 4 \"MIXER:Lib/Scene\" 300 1 0 300 0 \"\" scene any rw 1
";

const TF_CATALOG: &str = "\
OK prminfo 0 \"MIXER:Current/InCh/Fader/On\" 40 1 0 1 1 \"\" integer any rw 1
OK scninfo 1000 \"MIXER:Lib/Bank/Scene\" 100 2 0 99 0 \"\" scene any rw 1
";

fn engine(source: &str, family: ConsoleFamily) -> ScpEngine {
    let catalog = Catalog::load(source, family, ChannelLabels::default()).unwrap();
    ScpEngine::new(Arc::new(catalog), ChannelAliases::new([Some(5), Some(9), None, None]))
}

fn observed_keys(events: &[EngineEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::Observed(obs) => Some(obs.key.clone()),
            EngineEvent::ProductIdentified(_) => None,
        })
        .collect()
}

#[test]
fn line_split_across_chunks_is_processed_once() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);

    let first = engine.feed(b"NOTIFY set MIXER:Current/InCh/Fader/Level 0 0 -1000\nNOTIFY set MIXER:Cur");
    assert_eq!(observed_keys(&first), vec!["MIXER_Current/InCh/Fader/Level"]);

    let second = engine.feed(b"rent/InCh/Fader/On 4 0 0\n");
    assert_eq!(observed_keys(&second), vec!["MIXER_Current/InCh/Fader/On"]);

    let store = engine.store();
    assert_eq!(store.query("MIXER_Current/InCh/Fader/Level", 1, 1), Some(&Value::Int(-1000)));
    assert_eq!(store.query("MIXER_Current/InCh/Fader/On", 5, 1), Some(&Value::Int(0)));
    assert_eq!(store.len(), 2);
}

#[test]
fn toggle_uses_mirrored_state() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);
    let toggle = CommandOptions::channel(-1).value(CommandValue::Toggle);

    // Nothing known yet: the value is left out
    let cmd = engine
        .command(CommandPrefix::Set, "MIXER_Current/InCh/Fader/On", &toggle)
        .unwrap();
    assert_eq!(cmd.line, "set MIXER:Current/InCh/Fader/On 4 0");

    engine.feed(b"OK get MIXER:Current/InCh/Fader/On 4 0 1\n");
    let cmd = engine
        .command(CommandPrefix::Set, "MIXER_Current/InCh/Fader/On", &toggle)
        .unwrap();
    assert_eq!(cmd.line, "set MIXER:Current/InCh/Fader/On 4 0 0");
}

#[test]
fn two_dimensional_parameters() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);
    engine.feed(b"NOTIFY set MIXER:Current/InCh/ToMix/Level 2 7 -200\n");
    assert_eq!(
        engine.store().query("MIXER_Current/InCh/ToMix/Level", 3, 8),
        Some(&Value::Int(-200))
    );

    let cmd = engine
        .command(
            CommandPrefix::Get,
            "MIXER_Current/InCh/ToMix/Level",
            &CommandOptions::channel(3).y(8),
        )
        .unwrap();
    assert_eq!(cmd.line, "get MIXER:Current/InCh/ToMix/Level 2 7");
}

#[test]
fn macro_records_three_entries_and_overwrites_in_place() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);

    assert!(engine.macro_signal(MacroSignal::Start).is_none());
    engine.macro_signal(MacroSignal::Latch);

    engine.feed(b"NOTIFY set MIXER:Current/InCh/Fader/Level 0 0 100\n");
    engine.feed(b"NOTIFY set MIXER:Current/InCh/Fader/Level 1 0 200\n");
    engine.feed(b"NOTIFY set MIXER:Current/InCh/Label/Name 0 0 \"Lead Vox\"\n");
    engine.feed(b"NOTIFY set MIXER:Current/InCh/Fader/Level 1 0 -50\n");

    let preset = engine.macro_signal(MacroSignal::Start).unwrap();
    assert_eq!(preset.label, "Macro 1");
    assert!(preset.latch);
    assert_eq!(preset.actions.len(), 3);
    assert_eq!(preset.actions[1].x, 2);
    assert_eq!(preset.actions[1].value, CommandValue::Int(-50));
    assert_eq!(preset.actions[2].value, CommandValue::Text("Lead Vox".to_string()));
    assert_eq!(preset.feedbacks.len(), 3);
}

#[test]
fn repeated_scene_recalls_record_one_entry() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);

    engine.macro_signal(MacroSignal::Start);
    engine.macro_signal(MacroSignal::Unlatch);
    engine.feed(b"NOTIFY sscurrent_ex MIXER:Lib/Scene 12\n");
    engine.feed(b"NOTIFY sscurrent_ex MIXER:Lib/Scene 14\n");

    let preset = engine.macro_signal(MacroSignal::Start).unwrap();
    assert_eq!(preset.actions.len(), 1);
    assert_eq!(preset.actions[0].x, 14);
    let recall = engine
        .command(
            CommandPrefix::Set,
            &preset.actions[0].key,
            &CommandOptions::channel(14),
        )
        .unwrap();
    assert_eq!(recall.line, "ssrecall_ex MIXER:Lib/Scene 14");
}

#[test]
fn empty_macro_does_not_consume_a_number() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);

    engine.macro_signal(MacroSignal::Start);
    assert!(engine.macro_signal(MacroSignal::Start).is_none());

    engine.macro_signal(MacroSignal::Start);
    engine.feed(b"NOTIFY set MIXER:Current/InCh/Fader/On 0 0 1\n");
    let preset = engine.macro_signal(MacroSignal::Start).unwrap();
    assert_eq!(preset.label, "Macro 1");
    assert_eq!(preset.actions[0].value, CommandValue::Toggle);
}

#[test]
fn scene_recall_and_feedback() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);
    let recall = engine
        .command(CommandPrefix::Set, "MIXER_Lib/Scene", &CommandOptions::channel(12))
        .unwrap();
    assert_eq!(recall.line, "ssrecall_ex MIXER:Lib/Scene 12");
    assert!(recall.repoll);

    engine.feed(b"NOTIFY sscurrent_ex MIXER:Lib/Scene 12\n");
    let current = FeedbackRequest::new("MIXER_Lib/Scene", CommandOptions::channel(12));
    let other = FeedbackRequest::new("MIXER_Lib/Scene", CommandOptions::channel(3));
    assert_eq!(engine.feedback(&current), FeedbackState::On);
    assert_eq!(engine.feedback(&other), FeedbackState::Off);
}

#[test]
fn tf_scene_banks_ride_on_the_address() {
    let mut engine = engine(TF_CATALOG, ConsoleFamily::Tf);

    let recall = engine
        .command(
            CommandPrefix::Set,
            "MIXER_Lib/Bank/Scene",
            &CommandOptions::channel(4).y(2),
        )
        .unwrap();
    assert_eq!(recall.line, "ssrecall_ex MIXER:Lib/Bank/Sceneb 4");

    engine.feed(b"NOTIFY sscurrent_ex MIXER:Lib/Bank/Sceneb 4\n");
    assert_eq!(engine.store().query("MIXER_Lib/Bank/Scene", 1, 2), Some(&Value::Int(4)));

    let feedback = FeedbackRequest::new("MIXER_Lib/Bank/Scene", CommandOptions::channel(4).y(2));
    assert_eq!(engine.feedback(&feedback), FeedbackState::On);
    assert_eq!(engine.catalog().label(engine.catalog().get("MIXER_Lib/Bank/Scene").unwrap()), "Scene/Bank");
}

#[test]
fn name_feedback_shows_text() {
    let mut engine = engine(CL_CATALOG, ConsoleFamily::ClQl);
    engine.feed(b"OK get MIXER:Current/InCh/Label/Name 4 0 \"Kick In\"\n");
    let request = FeedbackRequest::new("MIXER_Current/InCh/Label/Name", CommandOptions::channel(-1));
    assert_eq!(engine.feedback(&request), FeedbackState::Text("Kick In".to_string()));
}

#[test]
fn catalog_loads_from_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join(ConsoleFamily::Tf.catalog_file_name()), TF_CATALOG).unwrap();

    let catalog = Catalog::from_dir(dir.path(), ConsoleFamily::Tf, ChannelLabels::default()).unwrap();
    assert_eq!(catalog.len(), 2);
    assert!(Catalog::from_dir(dir.path(), ConsoleFamily::Rivage, ChannelLabels::default()).is_err());
}
