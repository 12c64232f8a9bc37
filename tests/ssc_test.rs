mod common;

use piupsp::{
    ssc::{self, SscError},
    stx::{Note, NOTES_PER_ROW},
};

#[test]
fn test_parse_sample() {
    common::setup();
    let song = ssc::parse_file(common::data_path("ssc", "sample.ssc")).unwrap();

    assert_eq!(song.title, "Canon D");
    assert_eq!(song.artist, "BanYa");
    assert_eq!(song.author, "piupsp");
    assert_eq!(song.charts.len(), 2);

    let easy = &song.charts[0];
    assert_eq!(easy.difficulty, 3);
    assert_eq!(easy.blocks.len(), 1);
    let block = &easy.blocks[0];
    assert_eq!(block.bpm, 75.0);
    assert_eq!((block.beat_per_measure, block.beat_split), (4, 4));
    assert_eq!(block.speed, 1000);
    assert_eq!(block.row_count(), 8);
    assert_eq!(block.rows().next().unwrap()[0], Note::Tap as u8);
    assert_eq!(block.rows().nth(4).unwrap()[2], Note::Tap as u8);
}

#[test]
fn test_chart_overrides_time_signature() {
    let song = ssc::parse_file(common::data_path("ssc", "sample.ssc")).unwrap();
    let hard = &song.charts[1];

    assert_eq!(hard.difficulty, 17);
    let block = &hard.blocks[0];
    assert_eq!((block.beat_per_measure, block.beat_split), (3, 8));
    assert_eq!(block.row_count(), 4);

    let first: Vec<u8> = block.rows().map(|row| row[0]).collect();
    assert_eq!(
        first,
        vec![
            Note::HoldStart as u8,
            Note::Hold as u8,
            Note::HoldEnd as u8,
            Note::Empty as u8
        ]
    );
    let last: Vec<u8> = block.rows().map(|row| row[NOTES_PER_ROW - 1]).collect();
    assert_eq!(last, vec![Note::Tap as u8, 0, 0, 0]);
}

#[test]
fn test_short_rows_are_padded() {
    let song = ssc::parse("#DISPLAYBPM:100;\n#NOTEDATA:;\n#NOTES:\n01\n;\n").unwrap();
    let notes = &song.charts[0].blocks[0].notes;
    assert_eq!(notes.len(), NOTES_PER_ROW);
    assert_eq!(notes[1], Note::Tap as u8);
    assert!(notes[2..].iter().all(|&n| n == 0));
}

#[test]
fn test_chart_without_notes() {
    let song = ssc::parse("#DISPLAYBPM:90;\n#NOTEDATA:;\n#METER:4;\n").unwrap();
    assert_eq!(song.charts.len(), 1);
    assert_eq!(song.charts[0].difficulty, 4);
    assert_eq!(song.charts[0].blocks.len(), 1);
    assert_eq!(song.charts[0].blocks[0].bpm, 45.0);
    assert!(song.charts[0].blocks[0].notes.is_empty());
}

#[test]
fn test_invalid_display_bpm() {
    let err = ssc::parse("#TITLE:x;\n#DISPLAYBPM:fast;\n").unwrap_err();
    assert!(matches!(
        err,
        SscError::InvalidDisplayBpm { line: 2, ref value } if value == "fast"
    ));
    assert!(ssc::parse("#DISPLAYBPM:-5;\n").is_err());
}

#[test]
fn test_invalid_time_signature() {
    assert!(matches!(
        ssc::parse("#TIMESIGNATURES:0.000=4;\n"),
        Err(SscError::InvalidTimeSignature { line: 1, .. })
    ));
    assert!(matches!(
        ssc::parse("#NOTEDATA:;\n#TIMESIGNATURES:0.000=0=4;\n"),
        Err(SscError::InvalidTimeSignature { line: 2, .. })
    ));
}

#[test]
fn test_invalid_meter() {
    assert!(matches!(
        ssc::parse("#NOTEDATA:;\n#METER:hard;\n"),
        Err(SscError::InvalidMeter { line: 2, .. })
    ));
}

#[test]
fn test_missing_file() {
    assert!(matches!(
        ssc::parse_file(common::data_path("ssc", "missing.ssc")),
        Err(SscError::Io(_))
    ));
}
