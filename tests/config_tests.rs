// tests/config_tests.rs

use taverna_server::config::{compose_database_url, normalize_generator_url, DbParts};
use taverna_server::service::Pagination;

fn parts() -> DbParts {
    DbParts {
        host: "db".into(),
        port: 5432,
        user: "user".into(),
        password: "password".into(),
        name: "rpg_saas".into(),
        sslmode: "disable".into(),
    }
}

#[test]
fn composes_database_url_from_parts() {
    assert_eq!(
        compose_database_url(&parts()),
        "postgres://user:password@db:5432/rpg_saas?sslmode=disable"
    );
}

#[test]
fn credentials_are_percent_encoded() {
    let url = compose_database_url(&DbParts {
        password: "p@ss:w/rd".into(),
        ..parts()
    });
    assert!(url.starts_with("postgres://user:p%40ss%3Aw%2Frd@db:5432/"), "{url}");
}

#[test]
fn generator_url_normalization() {
    assert_eq!(
        normalize_generator_url("http://localhost:5000/"),
        "http://localhost:5000"
    );
    assert_eq!(
        normalize_generator_url("https://gen.example.com"),
        "https://gen.example.com"
    );
    assert_eq!(
        normalize_generator_url("rpg-generator"),
        "https://rpg-generator.onrender.com"
    );
}

#[test]
fn pagination_clamps() {
    assert_eq!(Pagination::new(0, 0), Pagination { limit: 20, offset: 0 });
    assert_eq!(Pagination::new(-5, -5), Pagination { limit: 20, offset: 0 });
    assert_eq!(Pagination::new(500, 40), Pagination { limit: 100, offset: 40 });
    assert_eq!(Pagination::new(7, 3), Pagination { limit: 7, offset: 3 });
}

#[test]
fn pagination_ignores_garbage() {
    assert_eq!(
        Pagination::from_query(Some("abc"), Some("-1")),
        Pagination::default()
    );
    assert_eq!(
        Pagination::from_query(Some(" 50 "), None),
        Pagination { limit: 50, offset: 0 }
    );
    assert_eq!(Pagination::from_query(None, Some("10")).offset, 10);
}
