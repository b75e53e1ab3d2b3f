pub mod accounts_db_operations;
pub mod documents_db_operations;
