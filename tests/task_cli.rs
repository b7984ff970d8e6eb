mod support;

use predicates::str::contains;

use support::{dmy_from_today, TestSite};

struct Crew {
    site: TestSite,
    project_id: String,
    ana_id: String,
    bob_id: String,
    sup_id: String,
}

/// Boss (gerente) + Sup (supervisor) + Ana/Bob (empleados), boss signed in
fn crew() -> Result<Crew, Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    let ana_id = site.signup("ana@example.com", "Ana");
    let bob_id = site.signup("bob@example.com", "Bob");
    let sup_id = site.signup("sup@example.com", "Sup");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");
    // add_member leaves the session as the newly accepted member, so the
    // manager session must be restored before each subsequent invite.
    site.add_member(&project_id, "ana@example.com", "empleado");
    site.login("boss@example.com");
    site.add_member(&project_id, "bob@example.com", "empleado");
    site.login("boss@example.com");
    site.add_member(&project_id, "sup@example.com", "supervisor");
    site.login("boss@example.com");
    Ok(Crew {
        site,
        project_id,
        ana_id,
        bob_id,
        sup_id,
    })
}

fn new_task(site: &TestSite, project_id: &str, title: &str, assignee: &str) -> String {
    let data = site.json(&[
        "task",
        "new",
        project_id,
        title,
        "--assignee",
        assignee,
        "--due",
        &dmy_from_today(30),
    ]);
    data["id"].as_str().expect("task id").to_string()
}

#[test]
fn created_tasks_start_pending_and_active() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    let task_id = new_task(&crew.site, &crew.project_id, "Colar losa", "ana@example.com");

    let list = crew.site.json(&["task", "list", &crew.project_id]);
    assert_eq!(list["active"].as_u64(), Some(1));
    assert_eq!(list["completed"].as_u64(), Some(0));
    assert_eq!(list["overdue"].as_u64(), Some(0));
    assert_eq!(
        list["buckets"]["active"][0]["id"].as_str(),
        Some(task_id.as_str())
    );
    assert_eq!(
        list["buckets"]["active"][0]["status"].as_str(),
        Some("pendiente")
    );
    Ok(())
}

#[test]
fn due_date_honors_the_project_end_boundary() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;

    // Equal to the project end date (today + 365) is accepted
    crew.site.json(&[
        "task",
        "new",
        &crew.project_id,
        "Colar losa",
        "--assignee",
        "ana@example.com",
        "--due",
        &dmy_from_today(365),
    ]);

    // One day past the end date is rejected
    crew.site
        .cmd()
        .args([
            "task",
            "new",
            &crew.project_id,
            "Rematar muro",
            "--assignee",
            "ana@example.com",
            "--due",
            &dmy_from_today(366),
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("project end date"));

    // Today is not strictly after today
    crew.site
        .cmd()
        .args([
            "task",
            "new",
            &crew.project_id,
            "Rematar muro",
            "--assignee",
            "ana@example.com",
            "--due",
            &dmy_from_today(0),
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("after today"));
    Ok(())
}

#[test]
fn malformed_due_dates_are_validation_errors() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    for bad in ["2025-01", "31/12/2025", "30-02-2025"] {
        crew.site
            .cmd()
            .args([
                "task",
                "new",
                &crew.project_id,
                "Colar losa",
                "--assignee",
                "ana@example.com",
                "--due",
                bad,
            ])
            .assert()
            .failure()
            .code(2)
            .stderr(contains("Validation"));
    }
    Ok(())
}

#[test]
fn workers_see_only_their_own_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    new_task(&crew.site, &crew.project_id, "Colar losa", "ana@example.com");
    new_task(&crew.site, &crew.project_id, "Armar castillo", "bob@example.com");
    new_task(&crew.site, &crew.project_id, "Revisar planos", "sup@example.com");

    crew.site.login("ana@example.com");
    let list = crew.site.json(&["task", "list", &crew.project_id]);
    assert_eq!(list["active"].as_u64(), Some(1));
    assert_eq!(
        list["buckets"]["active"][0]["assignee"].as_str(),
        Some(crew.ana_id.as_str())
    );
    Ok(())
}

#[test]
fn supervisors_see_their_own_and_workers_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    new_task(&crew.site, &crew.project_id, "Colar losa", "ana@example.com");
    new_task(&crew.site, &crew.project_id, "Armar castillo", "bob@example.com");
    new_task(&crew.site, &crew.project_id, "Revisar planos", "sup@example.com");
    new_task(&crew.site, &crew.project_id, "Pagar nomina", "boss@example.com");

    crew.site.login("sup@example.com");
    let list = crew.site.json(&["task", "list", &crew.project_id]);
    // Own task plus the two empleados'; not the gerente's
    assert_eq!(list["active"].as_u64(), Some(3));
    let assignees: Vec<&str> = list["buckets"]["active"]
        .as_array()
        .expect("bucket")
        .iter()
        .map(|task| task["assignee"].as_str().expect("assignee"))
        .collect();
    assert!(assignees.contains(&crew.ana_id.as_str()));
    assert!(assignees.contains(&crew.bob_id.as_str()));
    assert!(assignees.contains(&crew.sup_id.as_str()));

    // The gerente sees everything
    crew.site.login("boss@example.com");
    let list = crew.site.json(&["task", "list", &crew.project_id]);
    assert_eq!(list["active"].as_u64(), Some(4));
    Ok(())
}

#[test]
fn list_filters_by_priority_and_assignee() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    crew.site.json(&[
        "task",
        "new",
        &crew.project_id,
        "Urgente",
        "--assignee",
        "ana@example.com",
        "--priority",
        "alta",
        "--due",
        &dmy_from_today(10),
    ]);
    new_task(&crew.site, &crew.project_id, "Normal", "bob@example.com");

    let list = crew.site.json(&[
        "task",
        "list",
        &crew.project_id,
        "--priority",
        "alta",
    ]);
    assert_eq!(list["active"].as_u64(), Some(1));

    let list = crew.site.json(&[
        "task",
        "list",
        &crew.project_id,
        "--assignee",
        "bob@example.com",
    ]);
    assert_eq!(list["active"].as_u64(), Some(1));
    assert_eq!(
        list["buckets"]["active"][0]["assignee"].as_str(),
        Some(crew.bob_id.as_str())
    );
    Ok(())
}

#[test]
fn workers_may_not_create_tasks() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    crew.site.login("ana@example.com");
    crew.site
        .cmd()
        .args([
            "task",
            "new",
            &crew.project_id,
            "Colar losa",
            "--assignee",
            "ana@example.com",
            "--due",
            &dmy_from_today(30),
        ])
        .assert()
        .failure()
        .code(3);
    Ok(())
}

#[test]
fn completion_requires_comment_and_evidence() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    let task_id = new_task(&crew.site, &crew.project_id, "Colar losa", "ana@example.com");

    crew.site.login("ana@example.com");
    crew.site
        .cmd()
        .args(["task", "start", &task_id])
        .assert()
        .success();

    crew.site
        .cmd()
        .args([
            "task", "complete", &task_id, "--comment", " ", "--evidence", "x.jpg",
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("comment"));

    let data = crew.site.json(&[
        "task",
        "complete",
        &task_id,
        "--comment",
        "losa colada y nivelada",
        "--evidence",
        "https://img.example/losa.jpg",
    ]);
    assert_eq!(data["status"].as_str(), Some("completada"));
    assert_eq!(
        data["completion"]["evidence"].as_str(),
        Some("https://img.example/losa.jpg")
    );

    // Completed tasks accept no further transitions
    crew.site
        .cmd()
        .args(["task", "start", &task_id])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("already completed"));

    let list = crew.site.json(&["task", "list", &crew.project_id]);
    assert_eq!(list["completed"].as_u64(), Some(1));
    assert_eq!(list["active"].as_u64(), Some(0));
    Ok(())
}

#[test]
fn due_date_change_is_manager_only_with_history_and_notification(
) -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    let task_id = new_task(&crew.site, &crew.project_id, "Colar losa", "ana@example.com");

    // Supervisors are denied
    crew.site.login("sup@example.com");
    crew.site
        .cmd()
        .args([
            "task",
            "due",
            &task_id,
            "--date",
            &dmy_from_today(45),
            "--reason",
            "rain delay",
        ])
        .assert()
        .failure()
        .code(3);

    // The gerente may change it; history records the amendment
    crew.site.login("boss@example.com");
    let data = crew.site.json(&[
        "task",
        "due",
        &task_id,
        "--date",
        &dmy_from_today(45),
        "--reason",
        "rain delay",
    ]);
    let changes = data["due_date_changes"].as_array().expect("history");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["reason"].as_str(), Some("rain delay"));

    // The assignee finds a date-change notification in the feed
    crew.site.login("ana@example.com");
    let feed = crew.site.json(&["notify", "list"]);
    let kinds: Vec<&str> = feed["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["kind"].as_str().expect("kind"))
        .collect();
    assert!(kinds.contains(&"date_change"));
    Ok(())
}

#[test]
fn stats_count_by_predicate() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    let first = new_task(&crew.site, &crew.project_id, "Colar losa", "ana@example.com");
    new_task(&crew.site, &crew.project_id, "Armar castillo", "bob@example.com");
    let third = new_task(&crew.site, &crew.project_id, "Revisar planos", "sup@example.com");

    crew.site
        .cmd()
        .args(["task", "start", &first])
        .assert()
        .success();
    crew.site
        .cmd()
        .args([
            "task",
            "complete",
            &third,
            "--comment",
            "done",
            "--evidence",
            "x.jpg",
        ])
        .assert()
        .success();

    let stats = crew.site.json(&["task", "stats", &crew.project_id]);
    assert_eq!(stats["total"].as_u64(), Some(3));
    assert_eq!(stats["completed"].as_u64(), Some(1));
    assert_eq!(stats["in_progress"].as_u64(), Some(1));
    assert_eq!(stats["overdue"].as_u64(), Some(0));
    Ok(())
}

#[test]
fn task_creation_consumes_material_stock() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    let material = crew.site.json(&[
        "material",
        "add",
        &crew.project_id,
        "Cemento gris",
        "--unit",
        "sacos",
        "--quantity",
        "20",
    ]);
    let material_id = material["id"].as_str().expect("material id");

    crew.site.json(&[
        "task",
        "new",
        &crew.project_id,
        "Colar losa",
        "--assignee",
        "ana@example.com",
        "--due",
        &dmy_from_today(30),
        "--material",
        &format!("{material_id}:8"),
    ]);

    let list = crew.site.json(&["material", "list", &crew.project_id]);
    assert_eq!(list["materials"][0]["quantity"].as_u64(), Some(12));

    // Over-allocation is rejected and stock stays put
    crew.site
        .cmd()
        .args([
            "task",
            "new",
            &crew.project_id,
            "Rematar muro",
            "--assignee",
            "ana@example.com",
            "--due",
            &dmy_from_today(30),
            "--material",
            &format!("{material_id}:99"),
        ])
        .assert()
        .failure()
        .code(2)
        .stderr(contains("on hand"));

    let list = crew.site.json(&["material", "list", &crew.project_id]);
    assert_eq!(list["materials"][0]["quantity"].as_u64(), Some(12));
    Ok(())
}

#[test]
fn task_show_respects_visibility() -> Result<(), Box<dyn std::error::Error>> {
    let crew = crew()?;
    let task_id = new_task(&crew.site, &crew.project_id, "Pagar nomina", "boss@example.com");

    crew.site.login("ana@example.com");
    crew.site
        .cmd()
        .args(["task", "show", &task_id])
        .assert()
        .failure()
        .code(3);

    crew.site.login("boss@example.com");
    let data = crew.site.json(&["task", "show", &task_id]);
    assert_eq!(data["id"].as_str(), Some(task_id.as_str()));
    Ok(())
}
