mod support;

use support::{dmy_from_today, TestSite};

#[test]
fn feed_shows_invitations_then_tasks_after_accept() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("ana@example.com", "Ana");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");

    let invitation = site.json(&[
        "member",
        "invite",
        &project_id,
        "--email",
        "ana@example.com",
        "--role",
        "empleado",
    ]);
    let invitation_id = invitation["id"].as_str().expect("invitation id");

    site.login("ana@example.com");
    let feed = site.json(&["notify", "list"]);
    assert_eq!(feed["total"].as_u64(), Some(1));
    assert_eq!(feed["items"][0]["kind"].as_str(), Some("invitation"));

    site.json(&["member", "accept", invitation_id]);

    site.login("boss@example.com");
    site.json(&[
        "task",
        "new",
        &project_id,
        "Colar losa",
        "--assignee",
        "ana@example.com",
        "--due",
        &dmy_from_today(30),
    ]);

    site.login("ana@example.com");
    let feed = site.json(&["notify", "list"]);
    assert_eq!(feed["total"].as_u64(), Some(1));
    assert_eq!(feed["items"][0]["kind"].as_str(), Some("task"));
    Ok(())
}

#[test]
fn date_change_notifications_can_be_marked_read() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("ana@example.com", "Ana");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");
    site.add_member(&project_id, "ana@example.com", "empleado");

    site.login("boss@example.com");
    let task = site.json(&[
        "task",
        "new",
        &project_id,
        "Colar losa",
        "--assignee",
        "ana@example.com",
        "--due",
        &dmy_from_today(30),
    ]);
    let task_id = task["id"].as_str().expect("task id");
    site.json(&[
        "task",
        "due",
        task_id,
        "--date",
        &dmy_from_today(60),
        "--reason",
        "material delay",
    ]);

    site.login("ana@example.com");
    let feed = site.json(&["notify", "list"]);
    let date_change = feed["items"]
        .as_array()
        .expect("items")
        .iter()
        .find(|item| item["kind"].as_str() == Some("date_change"))
        .expect("date change entry");
    assert_eq!(date_change["read"].as_bool(), Some(false));
    let notification_id = date_change["id"].as_str().expect("notification id");

    let marked = site.json(&["notify", "read", notification_id]);
    assert_eq!(marked["changed"].as_bool(), Some(true));

    let feed = site.json(&["notify", "list"]);
    let date_change = feed["items"]
        .as_array()
        .expect("items")
        .iter()
        .find(|item| item["kind"].as_str() == Some("date_change"))
        .expect("date change entry");
    assert_eq!(date_change["read"].as_bool(), Some(true));
    Ok(())
}

#[test]
fn finalized_projects_drop_task_entries() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("ana@example.com", "Ana");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");
    site.add_member(&project_id, "ana@example.com", "empleado");

    site.login("boss@example.com");
    site.json(&[
        "task",
        "new",
        &project_id,
        "Colar losa",
        "--assignee",
        "ana@example.com",
        "--due",
        &dmy_from_today(30),
    ]);
    site.cmd()
        .args(["project", "finalize", &project_id])
        .assert()
        .success();

    site.login("ana@example.com");
    let feed = site.json(&["notify", "list"]);
    assert_eq!(feed["total"].as_u64(), Some(0));
    Ok(())
}
