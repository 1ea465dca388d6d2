//! End-to-end statement scenarios against a catalog loaded from JSON.

use std::sync::Arc;

use rust_decimal::Decimal;
use tinysql_core::{
    Error, MetadataDatabase, RelationshipErrorKind, ResultSet, RowData, SelectListDedup, SqlConfig,
    Value,
};
use tinysql_query::{Builder, JoinType, Operator, SubSelect, UpdateOptions};

fn catalog() -> Arc<MetadataDatabase> {
    let db = MetadataDatabase::from_json(include_str!("fixtures/crm.json")).expect("valid catalog fixture");
    Arc::new(db)
}

fn select(table: &str, columns: &[&str]) -> (Builder, tinysql_query::TableId) {
    let mut b = Builder::select().with_metadata(catalog());
    let t = b.add_table(table, None, None);
    b.add_columns(t, columns);
    (b, t)
}

#[test]
fn catalog_fixture_round_trips_through_json() {
    let db = catalog();
    let account = db.find_table("Account").unwrap();
    assert_eq!(account.primary_key, ["AccountID"]);
    assert_eq!(account.foreign_keys.len(), 2);
    let reparsed = MetadataDatabase::from_json(&db.to_json().unwrap()).unwrap();
    assert_eq!(&reparsed, db.as_ref());
}

#[test]
fn auto_join_follows_the_foreign_key() {
    let (mut b, account) = select("Account", &["AccountID", "Name"]);
    let join = b.auto_join(account, "OwningUserID").unwrap();
    assert_eq!(b.join(join).join_type(), JoinType::Inner);
    assert_eq!(
        b.compile().unwrap(),
        concat!(
            "SELECT    t0.AccountID, t0.Name, t1.FullName AS [OwningUserID_FullName]\r\n",
            "  FROM  Account t0\r\n",
            "INNER JOIN SystemUser t1 ON (t0.[OwningUserID] = t1.[SystemUserID])\r\n",
            "\r\n",
        )
    );
}

#[test]
fn nullable_foreign_key_joins_left_outer() {
    let (mut b, account) = select("Account", &["AccountID"]);
    b.auto_join(account, "PrimaryContactID").unwrap();
    assert!(
        b.compile()
            .unwrap()
            .contains("LEFT OUTER JOIN Contact t1 ON (t0.[PrimaryContactID] = t1.[ContactID])\r\n")
    );
}

#[test]
fn where_clause_and_empty_root() {
    let (mut b, _) = select("Account", &["AccountID", "Name"]);
    let root = b.root();
    b.and_group(root);
    let sql = b.compile().unwrap();
    assert!(!sql.contains("WHERE"));

    b.where_("Account", "AccountID", Operator::Equal, 526).unwrap();
    assert!(b.compile().unwrap().contains("\r\nWHERE (t0.[AccountID] = 526)\r\n"));
}

#[test]
fn compiling_twice_is_byte_identical() {
    let (mut b, account) = select("Account", &["AccountID", "Name"]);
    b.auto_join(account, "OwningUserID").unwrap();
    b.where_("Account", "Name", Operator::StartsWith, "Con").unwrap();
    b.sub_select(account, SubSelect::new("Contact", "AccountID", "ParentCustomerID"))
        .unwrap();
    let first = b.compile().unwrap();
    let frozen = b.clone().freeze().unwrap();
    assert_eq!(first, b.compile().unwrap());
    assert_eq!(first, frozen.sql());
}

#[test]
fn duplicate_output_names_are_resolved() {
    let (mut b, account) = select("Account", &["AccountID", "Name"]);
    let join = b.inner_join(account, "SystemUser");
    b.on(join, "OwningUserID", Operator::Equal, "SystemUserID");
    let user = b.join_target(join);
    b.add_column(user, "Name", None);

    let renamed = b.compile().unwrap();
    assert!(renamed.starts_with("SELECT    t0.AccountID, t0.Name, t1.Name AS [SystemUser_Name]\r\n"));

    let removed = b
        .clone()
        .with_config(SqlConfig::new().select_list_dedup(SelectListDedup::Remove))
        .compile()
        .unwrap();
    assert!(removed.starts_with("SELECT    t0.AccountID, t0.Name\r\n"));

    b.clean_select_list(false);
    assert_eq!(b.compile().unwrap(), renamed);
}

#[test]
fn several_candidate_keys_are_ambiguous() {
    let (mut b, account) = select("Account", &["AccountID"]);
    let err = b.join_table(account, "Contact", None, JoinType::Inner).unwrap_err();
    match &err {
        Error::AmbiguousRelationship(e) => {
            assert_eq!(e.kind, RelationshipErrorKind::MultipleCandidates);
            assert_eq!(e.candidates, 2);
        }
        other => panic!("expected an ambiguous relationship, got {other:?}"),
    }
    assert!(err.to_string().contains("is referenced by 2 keys in the table dbo.Contact"));

    let err = b.sub_select_related(account, "Contact").unwrap_err();
    assert!(err.is_relationship_error());
    assert!(b.sub_queries().next().is_none());
}

#[test]
fn update_from_row_sets_changes_and_outputs_key() {
    let db = catalog();
    let meta = Arc::clone(db.find_table("Account").unwrap());
    let mut row = RowData::for_table(meta);
    row.load("AccountID", Value::Int(526));
    row.load("Name", Value::from("Contoso"));
    row.load("Revenue", Value::Null);
    row.set("Name", "Contoso Ltd");
    row.set("Revenue", Decimal::new(125_000, 0));

    let with_output = UpdateOptions {
        only_changes: true,
        output_primary_key: true,
        ..UpdateOptions::default()
    };
    let sql = Builder::update_from_row(&row, &with_output)
        .unwrap()
        .unwrap()
        .compile()
        .unwrap();
    assert!(sql.contains("   SET  Name = @Name, Revenue = @Revenue\r\n"));
    assert_eq!(sql.matches("OUTPUT ").count(), 1);
    assert!(sql.contains("OUTPUT  inserted.AccountID INTO @outputAccount"));
    assert!(sql.contains("WHERE (Account.[AccountID] = 526)\r\n"));
    assert!(sql.contains("SELECT  * FROM @outputAccount\r\n"));

    let without_output = UpdateOptions {
        only_changes: true,
        ..UpdateOptions::default()
    };
    let sql = Builder::update_from_row(&row, &without_output)
        .unwrap()
        .unwrap()
        .compile()
        .unwrap();
    assert_eq!(sql.matches(" = @").count(), 2);
    assert!(!sql.contains("SELECT"));
}

#[test]
fn children_are_distributed_without_duplication() {
    let (mut b, account) = select("Account", &["AccountID", "Name"]);
    let contacts = b
        .sub_select(account, SubSelect::new("Contact", "AccountID", "ParentCustomerID").name("Contacts"))
        .unwrap();
    let base = contacts.base_table().unwrap();
    contacts.add_columns(base, &["ContactID", "FullName"]);

    let accounts = ResultSet::new(["AccountID", "Name"])
        .with_row([Value::Int(1), Value::from("Contoso")])
        .with_row([Value::Int(2), Value::from("Fabrikam")])
        .with_row([Value::Int(3), Value::from("Northwind")]);
    let children = ResultSet::new(["ParentCustomerID", "ContactID", "FullName"])
        .with_row([Value::Int(1), Value::Int(13), Value::from("C")])
        .with_row([Value::Int(3), Value::Int(31), Value::from("D")])
        .with_row([Value::Int(1), Value::Int(11), Value::from("A")])
        .with_row([Value::Int(4), Value::Int(41), Value::from("orphan")]);

    let tree = b.assemble(vec![accounts, children]).unwrap();
    let counts: Vec<usize> = tree
        .iter()
        .map(|row| row.child("Contacts").map_or(0, |c| c.len()))
        .collect();
    assert_eq!(counts, [2, 0, 1]);

    let first: Vec<&Value> = tree
        .get(0)
        .unwrap()
        .child("Contacts")
        .unwrap()
        .iter()
        .filter_map(|r| r.get("ContactID"))
        .collect();
    assert_eq!(first, [&Value::Int(11), &Value::Int(13)]);
}

#[test]
fn nested_sub_selects_assemble_depth_first() {
    let (mut b, account) = select("Account", &["AccountID", "Name"]);
    let contacts = b
        .sub_select(account, SubSelect::new("Contact", "AccountID", "ParentCustomerID"))
        .unwrap();
    let contact = contacts.base_table().unwrap();
    contacts.add_column(contact, "ContactID", None);
    contacts
        .sub_select(contact, SubSelect::new("Account", "ContactID", "PrimaryContactID").name("Primary"))
        .unwrap();
    assert_eq!(b.result_set_count(), 3);

    let sql = b.compile().unwrap();
    assert_eq!(sql.matches("-- Sub Query").count(), 2);
    assert!(sql.contains("  INTO  #tmp_Account_1_1\r\n"));

    let sets = vec![
        ResultSet::new(["AccountID"]).with_row([Value::Int(1)]),
        ResultSet::new(["ParentCustomerID", "ContactID"])
            .with_row([Value::Int(1), Value::Int(10)])
            .with_row([Value::Int(1), Value::Int(20)]),
        ResultSet::new(["PrimaryContactID", "AccountID"])
            .with_row([Value::Int(20), Value::Int(7)])
            .with_row([Value::Int(20), Value::Int(8)]),
    ];
    let tree = b.assemble(sets).unwrap();
    let contacts = tree.get(0).unwrap().child("ContactList").unwrap();
    assert_eq!(contacts.len(), 2);
    assert!(contacts.get(0).unwrap().child("Primary").unwrap().is_empty());
    assert_eq!(contacts.get(1).unwrap().child("Primary").unwrap().len(), 2);
}
