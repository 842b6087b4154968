//! Collection database schema and the JSON blobs stored in its `col` row.

use serde_json::{Value, json};

/// Collection schema version written to `col.ver`.
pub const SCHEMA_VERSION: i64 = 11;

/// Tables and indexes of a schema 11 collection.
pub const SCHEMA: &str = r#"
CREATE TABLE col (
    id              integer primary key,
    crt             integer not null,
    mod             integer not null,
    scm             integer not null,
    ver             integer not null,
    dty             integer not null,
    usn             integer not null,
    ls              integer not null,
    conf            text not null,
    models          text not null,
    decks           text not null,
    dconf           text not null,
    tags            text not null
);
CREATE TABLE notes (
    id              integer primary key,
    guid            text not null,
    mid             integer not null,
    mod             integer not null,
    usn             integer not null,
    tags            text not null,
    flds            text not null,
    sfld            integer not null,
    csum            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE cards (
    id              integer primary key,
    nid             integer not null,
    did             integer not null,
    ord             integer not null,
    mod             integer not null,
    usn             integer not null,
    type            integer not null,
    queue           integer not null,
    due             integer not null,
    ivl             integer not null,
    factor          integer not null,
    reps            integer not null,
    lapses          integer not null,
    left            integer not null,
    odue            integer not null,
    odid            integer not null,
    flags           integer not null,
    data            text not null
);
CREATE TABLE revlog (
    id              integer primary key,
    cid             integer not null,
    usn             integer not null,
    ease            integer not null,
    ivl             integer not null,
    lastIvl         integer not null,
    factor          integer not null,
    time            integer not null,
    type            integer not null
);
CREATE TABLE graves (
    usn             integer not null,
    oid             integer not null,
    type            integer not null
);
CREATE INDEX ix_notes_usn on notes (usn);
CREATE INDEX ix_cards_usn on cards (usn);
CREATE INDEX ix_revlog_usn on revlog (usn);
CREATE INDEX ix_cards_nid on cards (nid);
CREATE INDEX ix_cards_sched on cards (did, queue, due);
CREATE INDEX ix_revlog_cid on revlog (cid);
CREATE INDEX ix_notes_csum on notes (csum);
"#;

/// Card styling shared by both templates.
pub const CARD_CSS: &str = ".card { font-family: arial; font-size: 20px; text-align: center; color: black; background-color: white; }
.example { margin-top: 1em; font-size: 18px; }
.example-english { color: #555; font-style: italic; }";

/// A card template: front and back markup.
#[derive(Debug, Clone)]
pub struct Template {
    pub name: String,
    pub front: String,
    pub back: String,
    /// Field ordinals of which at least one must be non-empty for the card to exist.
    pub required_fields: Vec<usize>,
}

/// Note type description: field names and card templates.
#[derive(Debug, Clone)]
pub struct NoteModel {
    pub id: i64,
    pub name: String,
    pub fields: Vec<String>,
    pub templates: Vec<Template>,
}

impl NoteModel {
    /// `models` JSON for the `col` row.
    pub fn to_json(&self, deck_id: i64, modified: i64) -> Value {
        let fields: Vec<Value> = self
            .fields
            .iter()
            .enumerate()
            .map(|(ord, name)| {
                json!({
                    "name": name,
                    "ord": ord,
                    "font": "Arial",
                    "media": [],
                    "rtl": false,
                    "size": 20,
                    "sticky": false,
                })
            })
            .collect();

        let templates: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, t)| {
                json!({
                    "name": t.name,
                    "ord": ord,
                    "qfmt": t.front,
                    "afmt": t.back,
                    "bqfmt": "",
                    "bafmt": "",
                    "did": null,
                })
            })
            .collect();

        let req: Vec<Value> = self
            .templates
            .iter()
            .enumerate()
            .map(|(ord, t)| json!([ord, "any", t.required_fields]))
            .collect();

        json!({
            (self.id.to_string()): {
                "id": self.id,
                "name": self.name,
                "type": 0,
                "mod": modified,
                "usn": -1,
                "sortf": 0,
                "did": deck_id,
                "tmpls": templates,
                "flds": fields,
                "css": CARD_CSS,
                "latexPre": "\\documentclass[12pt]{article}\n\\special{papersize=3in,5in}\n\\usepackage[utf8]{inputenc}\n\\usepackage{amssymb,amsmath}\n\\pagestyle{empty}\n\\setlength{\\parindent}{0in}\n\\begin{document}\n",
                "latexPost": "\\end{document}",
                "req": req,
                "tags": [],
                "vers": [],
            }
        })
    }
}

fn deck_json(id: i64, name: &str, modified: i64) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "mod": modified,
        "usn": -1,
        "dyn": 0,
        "conf": 1,
        "collapsed": false,
        "extendNew": 0,
        "extendRev": 50,
        "newToday": [0, 0],
        "revToday": [0, 0],
        "lrnToday": [0, 0],
        "timeToday": [0, 0],
    })
}

/// `decks` JSON: the default deck plus the generated one.
pub fn decks_json(deck_id: i64, deck_name: &str, modified: i64) -> Value {
    json!({
        "1": deck_json(1, "Default", modified),
        (deck_id.to_string()): deck_json(deck_id, deck_name, modified),
    })
}

/// `conf` JSON with the generated model selected.
pub fn conf_json(model_id: i64) -> Value {
    json!({
        "activeDecks": [1],
        "addToCur": true,
        "collapseTime": 1200,
        "curDeck": 1,
        "curModel": model_id.to_string(),
        "dueCounts": true,
        "estTimes": true,
        "newBury": true,
        "newSpread": 0,
        "nextPos": 1,
        "sortBackwards": false,
        "sortType": "noteFld",
        "timeLim": 0,
    })
}

/// `dconf` JSON holding the default deck options.
pub fn dconf_json() -> Value {
    json!({
        "1": {
            "id": 1,
            "name": "Default",
            "mod": 0,
            "usn": 0,
            "dyn": false,
            "autoplay": true,
            "replayq": true,
            "timer": 0,
            "maxTaken": 60,
            "new": {
                "bury": true,
                "delays": [1.0, 10.0],
                "initialFactor": 2500,
                "ints": [1, 4, 7],
                "order": 1,
                "perDay": 20,
                "separate": true,
            },
            "lapse": {
                "delays": [10.0],
                "leechAction": 0,
                "leechFails": 8,
                "minInt": 1,
                "mult": 0.0,
            },
            "rev": {
                "bury": true,
                "ease4": 1.3,
                "fuzz": 0.05,
                "ivlFct": 1,
                "maxIvl": 36500,
                "minSpace": 1,
                "perDay": 100,
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model() -> NoteModel {
        NoteModel {
            id: 1_234_567_890,
            name: "Test".to_string(),
            fields: vec!["Front".to_string(), "Back".to_string()],
            templates: vec![Template {
                name: "Card 1".to_string(),
                front: "{{Front}}".to_string(),
                back: "{{FrontSide}}<hr id=\"answer\">{{Back}}".to_string(),
                required_fields: vec![0],
            }],
        }
    }

    #[test]
    fn test_model_json_is_keyed_by_id() {
        let json = model().to_json(42, 100);
        let entry = &json["1234567890"];
        assert_eq!(entry["did"], 42);
        assert_eq!(entry["flds"][1]["name"], "Back");
        assert_eq!(entry["flds"][1]["ord"], 1);
        assert_eq!(entry["tmpls"][0]["qfmt"], "{{Front}}");
        assert_eq!(entry["req"][0], json!([0, "any", [0]]));
    }

    #[test]
    fn test_decks_json_includes_default() {
        let json = decks_json(77, "Vocab", 5);
        assert_eq!(json["1"]["name"], "Default");
        assert_eq!(json["77"]["name"], "Vocab");
        assert_eq!(json["77"]["id"], 77);
    }
}
