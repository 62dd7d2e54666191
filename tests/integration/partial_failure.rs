#![allow(missing_docs)]

use nestql::query::metadata::EntityDescriptor;
use nestql::{InMemoryCatalog, QueryService, Request, SqliteEngine};
use serde_json::{json, Value as JsonValue};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Catalog that advertises `Note` although the database has no such table.
fn catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_entity(
            EntityDescriptor::new("Account", ["Id", "Name"])
                .with_child("Contacts", "Contact", "AccountId")
                .with_child("Notes", "Note", "AccountId"),
        )
        .with_entity(EntityDescriptor::new("Contact", ["Id", "LastName", "AccountId"]))
        .with_entity(
            EntityDescriptor::new("Note", ["Id", "Body", "AccountId"])
                .with_child("Tags", "Tag", "NoteId"),
        )
        .with_entity(EntityDescriptor::new("Tag", ["Id", "Label", "NoteId"]))
}

fn engine() -> Result<SqliteEngine, Box<dyn std::error::Error>> {
    let engine = SqliteEngine::open_in_memory()?;
    engine.connection().execute_batch(
        "CREATE TABLE Account (Id TEXT PRIMARY KEY, Name TEXT);
         CREATE TABLE Contact (Id TEXT PRIMARY KEY, LastName TEXT, AccountId TEXT);
         INSERT INTO Account VALUES ('a1', 'Acme');
         INSERT INTO Contact VALUES ('c1', 'Smith', 'a1');",
    )?;
    Ok(engine)
}

#[test]
fn failing_child_keeps_parent_and_siblings() -> TestResult {
    let service = QueryService::new(catalog(), engine()?);
    let response = service.handle(&Request::new(
        "{ Account { Name Notes { Body Tags { Label } } Contacts { LastName } } }",
    ));

    assert_eq!(response.errors.len(), 1);
    assert!(response.errors[0].contains("no such table: Note"));
    assert_eq!(
        response.queries,
        vec![
            "SELECT Name, Id FROM Account",
            "SELECT Body, AccountId, Id FROM Note WHERE AccountId IN ('a1')",
            "SELECT Label, NoteId FROM Tag",
            "SELECT LastName, AccountId FROM Contact WHERE AccountId IN ('a1')",
        ]
    );
    assert_eq!(
        JsonValue::Object(response.data.expect("data")),
        json!({
            "Account": [
                {"Name": "Acme", "Notes": [], "Contacts": [{"LastName": "Smith"}]}
            ]
        })
    );
    Ok(())
}

#[test]
fn bad_pagination_skips_only_that_node() -> TestResult {
    let service = QueryService::new(catalog(), engine()?);
    let response = service.handle(&Request::new(
        "{ Account { Name Contacts(limit:many) { LastName } } }",
    ));

    assert_eq!(
        response.errors,
        vec!["Contact: argument 'limit' must be a non-negative integer (got 'many')"]
    );
    assert_eq!(response.queries, vec!["SELECT Name, Id FROM Account"]);
    assert_eq!(
        JsonValue::Object(response.data.expect("data")),
        json!({"Account": [{"Name": "Acme", "Contacts": []}]})
    );
    Ok(())
}
