use nairapower_core::db::open_db_in_memory;
use nairapower_core::model::family::INVITE_CODE_LEN;
use nairapower_core::{
    Family, FamilyRepository, FamilyService, FamilyServiceError, RepoError, SqliteFamilyRepository,
    SqliteUserRepository, User, UserRepository,
};
use rusqlite::Connection;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn family_service(
    conn: &Connection,
) -> FamilyService<SqliteFamilyRepository<'_>, SqliteUserRepository<'_>> {
    FamilyService::new(
        SqliteFamilyRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

fn register(conn: &Connection, email: &str) -> User {
    let user = User::register(email, None);
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .create_user(&user)
        .unwrap();
    user
}

fn reload(conn: &Connection, user: &User) -> User {
    SqliteUserRepository::try_new(conn)
        .unwrap()
        .get_user(&user.id)
        .unwrap()
        .unwrap()
}

#[test]
fn create_family_makes_creator_the_sole_member() {
    let conn = setup();
    let service = family_service(&conn);
    let creator = register(&conn, "a@home.ng");

    let family = service.create_family("  Test House ", &creator).unwrap();

    assert_eq!(family.name, "Test House");
    assert_eq!(family.creator_id, creator.id);
    assert_eq!(family.member_ids, vec![creator.id.clone()]);
    assert_eq!(family.invite_code.len(), INVITE_CODE_LEN);
    assert!(family
        .invite_code
        .chars()
        .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));

    assert_eq!(reload(&conn, &creator).family_id.as_deref(), Some(family.id.as_str()));
    assert_eq!(service.get_family(&family.id).unwrap().unwrap(), family);
}

#[test]
fn join_with_exact_code_adds_member_once() {
    let conn = setup();
    let service = family_service(&conn);
    let a = register(&conn, "a@home.ng");
    let b = register(&conn, "b@home.ng");
    let family = service.create_family("Test House", &a).unwrap();

    let joined = service.join_family(&family.invite_code, &b).unwrap().unwrap();
    let again = service
        .join_family(&format!("  {}  ", family.invite_code.to_lowercase()), &b)
        .unwrap()
        .unwrap();

    assert_eq!(joined.id, family.id);
    assert_eq!(again.member_ids, vec![a.id.clone(), b.id.clone()]);
    assert_eq!(reload(&conn, &b).family_id.as_deref(), Some(family.id.as_str()));
}

#[test]
fn join_with_unknown_code_has_no_side_effects() {
    let conn = setup();
    let service = family_service(&conn);
    let a = register(&conn, "a@home.ng");
    let b = register(&conn, "b@home.ng");
    let family = service.create_family("Test House", &a).unwrap();

    assert!(service.join_family("NOPE99", &b).unwrap().is_none());
    assert!(service.join_family("   ", &b).unwrap().is_none());

    assert!(reload(&conn, &b).family_id.is_none());
    let stored = service.get_family(&family.id).unwrap().unwrap();
    assert_eq!(stored.member_ids, vec![a.id]);
}

#[test]
fn joining_another_family_moves_user_pointer() {
    let conn = setup();
    let service = family_service(&conn);
    let a = register(&conn, "a@home.ng");
    let b = register(&conn, "b@home.ng");
    let first = service.create_family("First", &a).unwrap();
    let second = service.create_family("Second", &b).unwrap();

    service.join_family(&second.invite_code, &a).unwrap().unwrap();

    assert_eq!(reload(&conn, &a).family_id.as_deref(), Some(second.id.as_str()));
    assert!(service.get_family(&first.id).unwrap().unwrap().is_member(&a.id));
}

#[test]
fn list_members_returns_users_in_join_order() {
    let conn = setup();
    let service = family_service(&conn);
    let a = register(&conn, "a@home.ng");
    let b = register(&conn, "b@home.ng");
    let c = register(&conn, "c@home.ng");
    let family = service.create_family("Test House", &a).unwrap();
    service.join_family(&family.invite_code, &c).unwrap();
    service.join_family(&family.invite_code, &b).unwrap();

    let members = service.list_members(&family.id).unwrap();

    let ids: Vec<&str> = members.iter().map(|user| user.id.as_str()).collect();
    assert_eq!(ids, vec!["a@home.ng", "c@home.ng", "b@home.ng"]);
    assert!(matches!(
        service.list_members("missing").unwrap_err(),
        FamilyServiceError::FamilyNotFound(id) if id == "missing"
    ));
}

#[test]
fn repository_rejects_duplicate_invite_code_atomically() {
    let conn = setup();
    let families = SqliteFamilyRepository::try_new(&conn).unwrap();
    let a = register(&conn, "a@home.ng");
    let b = register(&conn, "b@home.ng");
    families
        .create_family(&Family::new("First", a.id.clone(), "ABC123", 1))
        .unwrap();

    let clash = Family::new("Second", b.id.clone(), "ABC123", 2);
    let err = families.create_family(&clash).unwrap_err();

    assert!(matches!(err, RepoError::DuplicateInviteCode(code) if code == "ABC123"));
    assert!(families.get_family(&clash.id).unwrap().is_none());
    assert!(reload(&conn, &b).family_id.is_none());
}

#[test]
fn repository_rejects_family_with_unknown_creator() {
    let conn = setup();
    let families = SqliteFamilyRepository::try_new(&conn).unwrap();

    let orphan = Family::new("Nowhere", "ghost@home.ng", "GHOST1", 1);
    let err = families.create_family(&orphan).unwrap_err();

    assert!(matches!(err, RepoError::NotFound { entity: "user", .. }));
    assert!(families.get_family(&orphan.id).unwrap().is_none());
}

#[test]
fn repository_rejects_family_violating_membership_invariant() {
    let conn = setup();
    let families = SqliteFamilyRepository::try_new(&conn).unwrap();
    let a = register(&conn, "a@home.ng");

    let mut family = Family::new("Broken", a.id.clone(), "BRK001", 1);
    family.member_ids.clear();

    assert!(matches!(
        families.create_family(&family).unwrap_err(),
        RepoError::Validation(_)
    ));
}

#[test]
fn find_by_name_returns_oldest_match() {
    let conn = setup();
    let families = SqliteFamilyRepository::try_new(&conn).unwrap();
    let a = register(&conn, "a@home.ng");
    let b = register(&conn, "b@home.ng");
    let older = Family::new("Twins", a.id.clone(), "TWIN01", 10);
    let newer = Family::new("Twins", b.id.clone(), "TWIN02", 20);
    families.create_family(&newer).unwrap();
    families.create_family(&older).unwrap();

    let found = families.find_by_name("Twins").unwrap().unwrap();
    assert_eq!(found.id, older.id);
    assert!(families.find_by_name("Nobody").unwrap().is_none());
}

#[test]
fn get_family_of_unknown_id_is_none() {
    let conn = setup();
    let service = family_service(&conn);

    let found: Result<Option<Family>, FamilyServiceError> = service.get_family("missing");

    assert!(found.unwrap().is_none());
}
