mod common;

use std::time::Duration;

use anyhow::Result;
use gati_c::auth::Role;
use gati_c::client::{is_unauthorized, ClientError, InventoryClient, InventoryTable};
use gati_c::database::Store;
use gati_c::inventory::{
    AssignRequest, AuditAction, AuditEntry, InventoryFilter, NewProduct, Product, ProductStatus, ProductUpdate,
};
use serde_json::json;

fn mouse(serial: Option<&str>) -> NewProduct {
    NewProduct {
        name: "Mouse".into(),
        brand: "Logitech".into(),
        category: "Peripherals".into(),
        location: "Store".into(),
        serial_number: serial.map(str::to_string),
        ..Default::default()
    }
}

async fn signed_in(server: &common::TestServer, role: Role) -> Result<InventoryClient> {
    let client = InventoryClient::new(&server.base_url)?;
    let user = client.login(common::email_for(role), common::PASSWORD).await?;
    assert_eq!(user.role, role);
    Ok(client)
}

#[tokio::test]
async fn requests_without_a_session_are_unauthorized() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = InventoryClient::new(&server.base_url)?;

    let err = client.me().await.unwrap_err();
    assert!(is_unauthorized(&err), "{}", err);
    assert!(matches!(err, ClientError::Api { status: 401, .. }));

    let err = client.login(common::email_for(Role::Reader), "nope").await.unwrap_err();
    assert!(is_unauthorized(&err));
    assert!(!client.is_signed_in().await);
    Ok(())
}

#[tokio::test]
async fn session_lasts_until_logout() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = signed_in(&server, Role::Reader).await?;
    assert!(client.is_signed_in().await);
    assert_eq!(client.me().await?.email, common::email_for(Role::Reader));

    client.logout().await?;
    assert!(!client.is_signed_in().await);
    assert!(is_unauthorized(&client.me().await.unwrap_err()));
    Ok(())
}

#[tokio::test]
async fn list_is_deduplicated_until_invalidated() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = signed_in(&server, Role::Editor).await?.with_dedup_window(Duration::from_secs(60));
    client.create(&mouse(Some("M-1"))).await?;

    let filter = InventoryFilter::default();
    assert_eq!(client.list(&filter).await?.total, 1);

    // Written behind the client's back
    let behind = Product::create(mouse(Some("M-2")))?;
    let entry = AuditEntry::new(AuditAction::Create, Some(behind.id), "seed", json!({}));
    server.store.insert_product(&behind, &entry).await?;
    assert_eq!(client.list(&filter).await?.total, 1);

    client.invalidate().await;
    assert_eq!(client.list(&filter).await?.total, 2);
    Ok(())
}

#[tokio::test]
async fn mutations_round_trip_and_clear_the_cache() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = signed_in(&server, Role::Editor).await?.with_dedup_window(Duration::from_secs(60));
    let filter = InventoryFilter::default();

    let created = client.create(&mouse(Some("M-9"))).await?;
    assert_eq!(client.list(&filter).await?.total, 1);

    let update = ProductUpdate { location: Some("Lab".into()), ..Default::default() };
    let updated = client.update(created.id, &update).await?;
    assert_eq!(updated.location, "Lab");
    assert_eq!(client.list(&filter).await?.items[0].location, "Lab");

    let assigned = client.assign(created.id, &AssignRequest { assignee: "Ana".into() }).await?;
    assert_eq!(assigned.status, ProductStatus::Assigned);
    let returned = client.return_to_stock(created.id).await?;
    assert_eq!(returned.status, ProductStatus::Available);

    // Editors cannot delete
    let err = client.delete(created.id).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 403, .. }));

    let admin = signed_in(&server, Role::Administrator).await?;
    admin.delete(created.id).await?;
    assert!(matches!(admin.get(created.id).await.unwrap_err(), ClientError::Api { status: 404, .. }));
    Ok(())
}

#[tokio::test]
async fn table_refresh_groups_and_reports_errors() -> Result<()> {
    let server = common::TestServer::start().await?;
    let client = signed_in(&server, Role::Editor).await?;
    for serial in [None, Some(""), Some("M-1")] {
        client.create(&mouse(serial)).await?;
    }

    let mut table = InventoryTable::from_query_str("category=peripherals");
    table.refresh(&client).await;
    assert_eq!(table.error(), None);
    assert_eq!(table.total(), 3);
    assert_eq!(table.rows().len(), 2);
    assert!(table.rows().iter().any(|r| r.label == "Mouse (x2)"));

    client.logout().await?;
    client.invalidate().await;
    table.refresh(&client).await;
    assert!(table.error().is_some());
    assert!(table.rows().is_empty());
    Ok(())
}
