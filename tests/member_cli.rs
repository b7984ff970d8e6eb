mod support;

use predicates::str::contains;

use support::TestSite;

#[test]
fn invite_and_accept_creates_an_accepted_membership() -> Result<(), Box<dyn std::error::Error>> {
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
    assert_eq!(invitation["status"].as_str(), Some("pending"));
    let invitation_id = invitation["id"].as_str().expect("invitation id");

    site.login("ana@example.com");
    let member = site.json(&["member", "accept", invitation_id]);
    assert_eq!(member["status"].as_str(), Some("accepted"));
    assert_eq!(member["role"].as_str(), Some("empleado"));

    site.login("boss@example.com");
    let list = site.json(&["member", "list", &project_id]);
    assert_eq!(list["total"].as_u64(), Some(2));
    Ok(())
}

#[test]
fn supervisor_invite_escalation_is_forbidden() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("sup@example.com", "Sup");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");
    site.add_member(&project_id, "sup@example.com", "supervisor");

    // logged in as the supervisor; inviting a gerente must fail
    site.cmd()
        .args([
            "member",
            "invite",
            &project_id,
            "--email",
            "x@y.com",
            "--role",
            "gerente",
        ])
        .assert()
        .failure()
        .code(3)
        .stderr(contains("Forbidden"));

    // inviting an empleado is allowed and lands as pending
    let invitation = site.json(&[
        "member",
        "invite",
        &project_id,
        "--email",
        "x@y.com",
        "--role",
        "empleado",
    ]);
    assert_eq!(invitation["status"].as_str(), Some("pending"));
    Ok(())
}

#[test]
fn workers_may_not_invite() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("ana@example.com", "Ana");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");
    site.add_member(&project_id, "ana@example.com", "empleado");

    site.cmd()
        .args([
            "member",
            "invite",
            &project_id,
            "--email",
            "x@y.com",
            "--role",
            "empleado",
        ])
        .assert()
        .failure()
        .code(3);
    Ok(())
}

#[test]
fn accept_is_limited_to_the_addressee() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("bob@example.com", "Bob");
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

    site.login("bob@example.com");
    site.cmd()
        .args(["member", "accept", invitation_id])
        .assert()
        .failure()
        .code(3)
        .stderr(contains("not addressed to you"));
    Ok(())
}

#[test]
fn reject_deletes_the_invitation() -> Result<(), Box<dyn std::error::Error>> {
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
    site.cmd()
        .args(["member", "reject", invitation_id])
        .assert()
        .success();

    // A fresh invite for the same email is possible again
    site.login("boss@example.com");
    site.json(&[
        "member",
        "invite",
        &project_id,
        "--email",
        "ana@example.com",
        "--role",
        "empleado",
    ]);
    Ok(())
}

#[test]
fn member_removal_is_manager_only() -> Result<(), Box<dyn std::error::Error>> {
    let site = TestSite::init()?;
    site.signup("ana@example.com", "Ana");
    site.signup("sup@example.com", "Sup");
    site.signup("boss@example.com", "Boss");
    let project_id = site.create_project("Bodega");
    let member_id = site.add_member(&project_id, "ana@example.com", "empleado");
    // add_member leaves the session as the newly accepted member, so restore
    // the manager session before inviting again.
    site.login("boss@example.com");
    site.add_member(&project_id, "sup@example.com", "supervisor");

    // supervisors may not remove members
    site.cmd()
        .args(["member", "rm", &project_id, &member_id])
        .assert()
        .failure()
        .code(3);

    site.login("boss@example.com");
    site.cmd()
        .args(["member", "rm", &project_id, &member_id])
        .assert()
        .success();

    let list = site.json(&["member", "list", &project_id]);
    assert_eq!(list["total"].as_u64(), Some(2));
    Ok(())
}
