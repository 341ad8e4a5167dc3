//! Test utilities for spinning up a real MongoDB instance via testcontainers.

use std::time::Duration;

use testcontainers::{
    core::{ContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage,
};

use crate::MongoStore;

/// Spin up a MongoDB container and return the container handle + a store bound
/// to `target_database.target_collection`.
///
/// The container is dropped (and stopped) when `ContainerAsync` goes out of scope,
/// so callers must hold it alive for the duration of the test.
pub async fn mongo_container(
    target_database: &str,
    target_collection: &str,
) -> (ContainerAsync<GenericImage>, MongoStore) {
    let image = GenericImage::new("mongo", "7.0")
        .with_exposed_port(ContainerPort::Tcp(27017))
        .with_wait_for(WaitFor::message_on_stdout("Waiting for connections"));

    let container: ContainerAsync<GenericImage> = image
        .start()
        .await
        .expect("Failed to start MongoDB container");

    let host_port = container
        .get_host_port_ipv4(27017)
        .await
        .expect("Failed to get MongoDB host port");

    let uri = format!("mongodb://127.0.0.1:{host_port}");
    let timeout = Duration::from_secs(10);
    let store = MongoStore::connect(&uri, target_database, target_collection, timeout)
        .await
        .expect("Failed to connect to MongoDB");

    (container, store)
}
