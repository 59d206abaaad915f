use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::job_registry;

/// Records when a scheduled job last completed so restarts don't re-run it early.
#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = job_registry, primary_key(job_name))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct JobRegistryItem {
    pub job_name: String,
    pub last_run_timestamp: SystemTime,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = job_registry, primary_key(job_name))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewJobRegistryItem<'a> {
    pub job_name: &'a str,
    pub last_run_timestamp: SystemTime,
}
