pub mod health_route;
pub mod test_db_route;
