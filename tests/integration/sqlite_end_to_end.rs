#![allow(missing_docs)]

use nestql::query::metadata::EntityDescriptor;
use nestql::{InMemoryCatalog, QueryService, Request, SqliteCatalog, SqliteEngine};
use serde_json::{json, Value as JsonValue};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn seeded_engine() -> Result<SqliteEngine, Box<dyn std::error::Error>> {
    let engine = SqliteEngine::open_in_memory()?;
    engine.connection().execute_batch(
        "CREATE TABLE Account (Id TEXT PRIMARY KEY, Name TEXT, Industry TEXT);
         CREATE TABLE Contact (
             Id TEXT PRIMARY KEY,
             LastName TEXT,
             AccountId TEXT REFERENCES Account(Id)
         );
         INSERT INTO Account VALUES
             ('a1', 'Acme', 'Retail'),
             ('a2', 'Globex', 'Energy'),
             ('a3', 'Acme Corp', 'Retail');
         INSERT INTO Contact VALUES
             ('c1', 'Smith', 'a1'),
             ('c2', 'Jones', 'a2'),
             ('c3', 'Brown', 'a1'),
             ('c4', 'O''Hara', 'a3');",
    )?;
    Ok(engine)
}

fn crm_catalog() -> InMemoryCatalog {
    InMemoryCatalog::new()
        .with_entity(
            EntityDescriptor::new("Account", ["Id", "Name", "Industry"])
                .with_child("Contacts", "Contact", "AccountId"),
        )
        .with_entity(EntityDescriptor::new("Contact", ["Id", "LastName", "AccountId"]))
}

#[test]
fn nested_query_compiles_one_statement_per_node() -> TestResult {
    let service = QueryService::new(crm_catalog(), seeded_engine()?);
    let response = service.handle(&Request::new(
        "{ accs: Account(limit:2) { Name Contacts { LastName } } }",
    ));

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.queries,
        vec![
            "SELECT Name, Id FROM Account LIMIT 2",
            "SELECT LastName, AccountId FROM Contact WHERE AccountId IN ('a1','a2')",
        ]
    );
    assert_eq!(
        JsonValue::Object(response.data.expect("data")),
        json!({
            "accs": [
                {"Name": "Acme", "Contacts": [{"LastName": "Smith"}, {"LastName": "Brown"}]},
                {"Name": "Globex", "Contacts": [{"LastName": "Jones"}]}
            ]
        })
    );
    Ok(())
}

#[test]
fn unknown_fields_are_dropped_silently() -> TestResult {
    let service = QueryService::new(crm_catalog(), seeded_engine()?);
    let response = service.handle(&Request::new("{ Account(limit:1) { Name, Bogus } }"));

    assert!(response.errors.is_empty());
    assert_eq!(response.queries, vec!["SELECT Name FROM Account LIMIT 1"]);
    let data = JsonValue::Object(response.data.expect("data"));
    assert_eq!(data, json!({"Account": [{"Name": "Acme"}]}));
    Ok(())
}

#[test]
fn unknown_root_yields_null_data() -> TestResult {
    let service = QueryService::new(crm_catalog(), seeded_engine()?);
    let response = service.handle(&Request::new("{ Bogus { id } }"));

    assert_eq!(response.data, None);
    assert_eq!(response.errors, vec!["Bogus is not a valid entity"]);
    assert!(response.queries.is_empty());
    Ok(())
}

#[test]
fn valid_roots_survive_an_unknown_sibling() -> TestResult {
    let service = QueryService::new(crm_catalog(), seeded_engine()?);
    let response = service.handle(&Request::new(
        "{ Bogus { Id } people: Contact(limit:1) { LastName } }",
    ));

    assert_eq!(response.errors, vec!["Bogus is not a valid entity"]);
    let data = JsonValue::Object(response.data.expect("data"));
    assert_eq!(data, json!({"people": [{"LastName": "Smith"}]}));
    Ok(())
}

#[test]
fn variables_are_substituted_before_parsing() -> TestResult {
    let service = QueryService::new(crm_catalog(), seeded_engine()?);
    let request = Request::new("{ Account(Name:$name) { Name Contacts { LastName } } }")
        .with_variable("name", "Acme Corp");
    let response = service.handle(&request);

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.queries[0],
        "SELECT Name, Id FROM Account WHERE Name = 'Acme Corp'"
    );
    let data = JsonValue::Object(response.data.expect("data"));
    assert_eq!(
        data,
        json!({"Account": [{"Name": "Acme Corp", "Contacts": [{"LastName": "O'Hara"}]}]})
    );
    Ok(())
}

#[test]
fn malformed_document_is_a_parse_error() -> TestResult {
    let service = QueryService::new(crm_catalog(), seeded_engine()?);
    let response = service.handle(&Request::new("   "));
    assert_eq!(response.data, None);
    assert_eq!(response.errors, vec!["query is empty"]);
    Ok(())
}

#[test]
fn introspected_catalog_serves_foreign_key_children() -> TestResult {
    let engine = seeded_engine()?;
    let catalog = SqliteCatalog::introspect(engine.connection(), None)?;
    let service = QueryService::new(catalog, engine);
    let response = service.handle(&Request::new(
        "{ Account(Industry:Energy) { Name Industry Contact { LastName } } }",
    ));

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    let data = JsonValue::Object(response.data.expect("data"));
    assert_eq!(
        data,
        json!({
            "Account": [
                {"Name": "Globex", "Industry": "Energy", "Contact": [{"LastName": "Jones"}]}
            ]
        })
    );
    Ok(())
}

fn integer_keyed_engine() -> Result<SqliteEngine, Box<dyn std::error::Error>> {
    let engine = SqliteEngine::open_in_memory()?;
    engine.connection().execute_batch(
        "CREATE TABLE Account (Id INTEGER PRIMARY KEY, Name TEXT);
         CREATE TABLE Contact (
             Id INTEGER PRIMARY KEY,
             LastName TEXT,
             AccountId REFERENCES Account(Id)
         );
         INSERT INTO Account VALUES (1, 'Acme'), (2, 'Globex');
         INSERT INTO Contact VALUES (10, 'Smith', 1), (11, 'Jones', 2), (12, 'Brown', 1);",
    )?;
    Ok(engine)
}

#[test]
fn integer_keys_join_through_untyped_foreign_key() -> TestResult {
    let engine = integer_keyed_engine()?;
    let catalog = SqliteCatalog::introspect(engine.connection(), None)?;
    let service = QueryService::new(catalog, engine);
    let response = service.handle(&Request::new("{ Account { Name Contact { LastName } } }"));

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.queries,
        vec![
            "SELECT Name, Id FROM Account",
            "SELECT LastName, AccountId FROM Contact WHERE AccountId IN (1,2)",
        ]
    );
    assert_eq!(
        JsonValue::Object(response.data.expect("data")),
        json!({
            "Account": [
                {"Name": "Acme", "Contact": [{"LastName": "Smith"}, {"LastName": "Brown"}]},
                {"Name": "Globex", "Contact": [{"LastName": "Jones"}]}
            ]
        })
    );
    Ok(())
}

#[test]
fn integer_key_filter_and_nested_identifiers() -> TestResult {
    let engine = integer_keyed_engine()?;
    let catalog = SqliteCatalog::introspect(engine.connection(), None)?;
    let service = QueryService::new(catalog, engine);
    let response = service.handle(&Request::new(
        "{ Account(Id:2) { Id Name Contact { Id LastName } } }",
    ));

    assert!(response.errors.is_empty(), "{:?}", response.errors);
    assert_eq!(
        response.queries,
        vec![
            "SELECT Id, Name FROM Account WHERE Id = '2'",
            "SELECT Id, LastName, AccountId FROM Contact WHERE AccountId IN (2)",
        ]
    );
    assert_eq!(
        JsonValue::Object(response.data.expect("data")),
        json!({
            "Account": [
                {"Id": 2, "Name": "Globex", "Contact": [{"Id": 11, "LastName": "Jones"}]}
            ]
        })
    );
    Ok(())
}
