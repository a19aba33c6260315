mod common;

use uuid::Uuid;

use common::{assert_invariants, draft, seeded};
use monday_backend::coordinator::AssignmentError;
use monday_backend::store::Entity;

#[tokio::test]
async fn create_with_manager_appoints_them() {
    let (store, coordinator, staff) = seeded().await;
    let ada = &staff.admins[0];

    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();

    assert_eq!(department.manager_id, Some(ada.employee_id));
    let ada = store.employee(ada.employee_id).await.unwrap();
    assert!(ada.is_department_manager);
    assert_eq!(ada.department_id, Some(department.department_id));
    assert_invariants(&store).await;
}

#[tokio::test]
async fn create_without_manager_touches_no_employee() {
    let (store, coordinator, staff) = seeded().await;

    let department = coordinator.assign_on_create(draft("Research"), None).await.unwrap();

    assert_eq!(department.manager_id, None);
    assert_eq!(store.employees().await, staff.all_sorted());
    assert_invariants(&store).await;
}

#[tokio::test]
async fn duplicate_manager_is_rejected_without_writes() {
    let (store, coordinator, staff) = seeded().await;
    let ada = &staff.admins[0];
    coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();
    let departments_before = store.departments().await;
    let employees_before = store.employees().await;

    let err = coordinator
        .assign_on_create(draft("Sales"), Some(ada.employee_id))
        .await
        .unwrap_err();

    assert_eq!(err, AssignmentError::DuplicateManager { manager_id: ada.employee_id });
    assert_eq!(store.departments().await, departments_before);
    assert_eq!(store.employees().await, employees_before);
}

#[tokio::test]
async fn non_admin_cannot_be_appointed() {
    let (store, coordinator, staff) = seeded().await;
    let alan = &staff.others[0];

    let err = coordinator
        .assign_on_create(draft("Research"), Some(alan.employee_id))
        .await
        .unwrap_err();

    assert_eq!(err, AssignmentError::IneligibleManager(alan.employee_id));
    assert!(store.departments().await.is_empty());
}

#[tokio::test]
async fn unknown_manager_is_not_found() {
    let (store, coordinator, _staff) = seeded().await;

    let err = coordinator
        .assign_on_create(draft("Research"), Some(404))
        .await
        .unwrap_err();

    assert_eq!(err, AssignmentError::employee_not_found(404));
    assert!(store.departments().await.is_empty());
}

#[tokio::test]
async fn failed_appointment_rolls_back_the_new_department() {
    let (store, coordinator, staff) = seeded().await;
    store.fail_after_writes(1);

    let err = coordinator
        .assign_on_create(draft("Research"), Some(staff.admins[0].employee_id))
        .await
        .unwrap_err();

    assert!(matches!(err, AssignmentError::StoreUnavailable(_)));
    assert!(store.departments().await.is_empty());
    assert_eq!(store.employees().await, staff.all_sorted());
}

#[tokio::test]
async fn reassignment_moves_the_flag() {
    let (store, coordinator, staff) = seeded().await;
    let (ada, grace) = (&staff.admins[0], &staff.admins[1]);
    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();

    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    assert_eq!(form.department.manager_id, Some(ada.employee_id));
    let updated = coordinator
        .apply_edit(
            department.department_id,
            form.edit_token,
            draft("Research & Development"),
            Some(grace.employee_id),
        )
        .await
        .unwrap();

    assert_eq!(updated.manager_id, Some(grace.employee_id));
    assert_eq!(updated.name, "Research & Development");
    let ada = store.employee(ada.employee_id).await.unwrap();
    let grace = store.employee(grace.employee_id).await.unwrap();
    assert!(!ada.is_department_manager);
    // the outgoing manager stays a member
    assert_eq!(ada.department_id, Some(department.department_id));
    assert!(grace.is_department_manager);
    assert_eq!(grace.department_id, Some(department.department_id));
    assert_invariants(&store).await;
}

#[tokio::test]
async fn edit_of_unmanaged_department_appoints_manager() {
    let (store, coordinator, staff) = seeded().await;
    let department = coordinator.assign_on_create(draft("Research"), None).await.unwrap();

    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    coordinator
        .apply_edit(
            department.department_id,
            form.edit_token,
            draft("Research"),
            Some(staff.admins[2].employee_id),
        )
        .await
        .unwrap();

    let manager = store.employee(staff.admins[2].employee_id).await.unwrap();
    assert!(manager.is_department_manager);
    assert_invariants(&store).await;
}

#[tokio::test]
async fn edit_can_clear_the_manager() {
    let (store, coordinator, staff) = seeded().await;
    let ada = &staff.admins[0];
    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();

    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    let updated = coordinator
        .apply_edit(department.department_id, form.edit_token, draft("Research"), None)
        .await
        .unwrap();

    assert_eq!(updated.manager_id, None);
    assert!(!store.employee(ada.employee_id).await.unwrap().is_department_manager);
    assert_invariants(&store).await;
}

#[tokio::test]
async fn keeping_the_manager_leaves_employees_alone() {
    let (store, coordinator, staff) = seeded().await;
    let department = coordinator
        .assign_on_create(draft("Research"), Some(staff.admins[0].employee_id))
        .await
        .unwrap();
    let employees_before = store.employees().await;

    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    let updated = coordinator
        .apply_edit(
            department.department_id,
            form.edit_token,
            draft("Renamed"),
            Some(staff.admins[0].employee_id),
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Renamed");
    assert_eq!(store.employees().await, employees_before);
}

#[tokio::test]
async fn edit_cannot_steal_another_departments_manager() {
    let (store, coordinator, staff) = seeded().await;
    let (ada, grace) = (&staff.admins[0], &staff.admins[1]);
    coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();
    let sales = coordinator
        .assign_on_create(draft("Sales"), Some(grace.employee_id))
        .await
        .unwrap();
    let form = coordinator.prepare_edit(sales.department_id).await.unwrap();

    let err = coordinator
        .apply_edit(sales.department_id, form.edit_token, draft("Sales"), Some(ada.employee_id))
        .await
        .unwrap_err();
    assert_eq!(err, AssignmentError::DuplicateManager { manager_id: ada.employee_id });
    assert_invariants(&store).await;

    // the form is shown again with the same token
    coordinator
        .apply_edit(
            sales.department_id,
            form.edit_token,
            draft("Sales"),
            Some(staff.admins[2].employee_id),
        )
        .await
        .unwrap();
    assert!(!store.employee(grace.employee_id).await.unwrap().is_department_manager);
    assert_invariants(&store).await;
}

#[tokio::test]
async fn failed_edit_leaves_rows_unchanged_and_can_be_retried() {
    let (store, coordinator, staff) = seeded().await;
    let (ada, grace) = (&staff.admins[0], &staff.admins[1]);
    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();
    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    let departments_before = store.departments().await;
    let employees_before = store.employees().await;

    // release of the old manager succeeds, the department write fails
    store.fail_after_writes(1);
    let err = coordinator
        .apply_edit(department.department_id, form.edit_token, draft("Research"), Some(grace.employee_id))
        .await
        .unwrap_err();

    assert!(matches!(err, AssignmentError::StoreUnavailable(_)));
    assert_eq!(store.departments().await, departments_before);
    assert_eq!(store.employees().await, employees_before);

    coordinator
        .apply_edit(department.department_id, form.edit_token, draft("Research"), Some(grace.employee_id))
        .await
        .unwrap();
    assert!(store.employee(grace.employee_id).await.unwrap().is_department_manager);
    assert_invariants(&store).await;
}

#[tokio::test]
async fn failed_final_appointment_is_rolled_back() {
    let (store, coordinator, staff) = seeded().await;
    let department = coordinator
        .assign_on_create(draft("Research"), Some(staff.admins[0].employee_id))
        .await
        .unwrap();
    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    let departments_before = store.departments().await;
    let employees_before = store.employees().await;

    store.fail_after_writes(2);
    let err = coordinator
        .apply_edit(
            department.department_id,
            form.edit_token,
            draft("Research"),
            Some(staff.admins[1].employee_id),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, AssignmentError::StoreUnavailable(_)));
    assert_eq!(store.departments().await, departments_before);
    assert_eq!(store.employees().await, employees_before);
}

#[tokio::test]
async fn unknown_edit_token_is_rejected() {
    let (_store, coordinator, _staff) = seeded().await;
    let department = coordinator.assign_on_create(draft("Research"), None).await.unwrap();

    let err = coordinator
        .apply_edit(department.department_id, Uuid::new_v4(), draft("Research"), None)
        .await
        .unwrap_err();

    assert_eq!(err, AssignmentError::EditSessionExpired);
}

#[tokio::test]
async fn token_is_bound_to_the_department_it_was_issued_for() {
    let (_store, coordinator, _staff) = seeded().await;
    let research = coordinator.assign_on_create(draft("Research"), None).await.unwrap();
    let sales = coordinator.assign_on_create(draft("Sales"), None).await.unwrap();
    let form = coordinator.prepare_edit(research.department_id).await.unwrap();

    let err = coordinator
        .apply_edit(sales.department_id, form.edit_token, draft("Sales"), None)
        .await
        .unwrap_err();

    assert_eq!(err, AssignmentError::EditSessionExpired);
}

#[tokio::test]
async fn stale_edit_form_is_a_conflict() {
    let (store, coordinator, staff) = seeded().await;
    let department = coordinator.assign_on_create(draft("Research"), None).await.unwrap();
    let first = coordinator.prepare_edit(department.department_id).await.unwrap();
    let second = coordinator.prepare_edit(department.department_id).await.unwrap();

    coordinator
        .apply_edit(
            department.department_id,
            first.edit_token,
            draft("Research"),
            Some(staff.admins[0].employee_id),
        )
        .await
        .unwrap();
    let err = coordinator
        .apply_edit(
            department.department_id,
            second.edit_token,
            draft("Research"),
            Some(staff.admins[1].employee_id),
        )
        .await
        .unwrap_err();

    assert_eq!(
        err,
        AssignmentError::ConcurrencyConflict {
            entity: Entity::Department,
            key: department.department_id
        }
    );
    assert!(!store.employee(staff.admins[1].employee_id).await.unwrap().is_department_manager);
    assert_invariants(&store).await;

    // a conflicting form has to be reloaded
    let err = coordinator
        .apply_edit(department.department_id, second.edit_token, draft("Research"), None)
        .await
        .unwrap_err();
    assert_eq!(err, AssignmentError::EditSessionExpired);
}

#[tokio::test]
async fn edit_of_deleted_department_is_not_found() {
    let (_store, coordinator, _staff) = seeded().await;
    let department = coordinator.assign_on_create(draft("Research"), None).await.unwrap();
    let form = coordinator.prepare_edit(department.department_id).await.unwrap();
    coordinator.delete(department.department_id).await.unwrap();

    let err = coordinator
        .apply_edit(department.department_id, form.edit_token, draft("Research"), None)
        .await
        .unwrap_err();

    assert_eq!(err, AssignmentError::department_not_found(department.department_id));
    assert!(coordinator.edit_sessions().is_empty());
}

#[tokio::test]
async fn release_clears_both_sides() {
    let (store, coordinator, staff) = seeded().await;
    let ada = &staff.admins[0];
    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();

    let released = coordinator.release(department.department_id).await.unwrap();

    assert_eq!(released.manager_id, None);
    assert!(!store.employee(ada.employee_id).await.unwrap().is_department_manager);
    assert_invariants(&store).await;

    // releasing an unmanaged department is a no-op
    let again = coordinator.release(department.department_id).await.unwrap();
    assert_eq!(again, released);
}

#[tokio::test]
async fn delete_releases_the_manager_first() {
    let (store, coordinator, staff) = seeded().await;
    let ada = &staff.admins[0];
    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();

    coordinator.delete(department.department_id).await.unwrap();

    assert!(store.departments().await.is_empty());
    let ada = store.employee(ada.employee_id).await.unwrap();
    assert!(!ada.is_department_manager);
    assert_eq!(ada.department_id, None);
    assert_invariants(&store).await;

    // the released manager is free for another department
    coordinator
        .assign_on_create(draft("Sales"), Some(ada.employee_id))
        .await
        .unwrap();
    assert_invariants(&store).await;
}

#[tokio::test]
async fn failed_release_keeps_the_manager() {
    let (store, coordinator, staff) = seeded().await;
    let department = coordinator
        .assign_on_create(draft("Research"), Some(staff.admins[0].employee_id))
        .await
        .unwrap();
    let departments_before = store.departments().await;
    let employees_before = store.employees().await;

    // the flag is cleared, then the department write fails
    store.fail_after_writes(1);
    let err = coordinator.release(department.department_id).await.unwrap_err();

    assert!(matches!(err, AssignmentError::StoreUnavailable(_)));
    assert_eq!(store.departments().await, departments_before);
    assert_eq!(store.employees().await, employees_before);
    assert_invariants(&store).await;
}

#[tokio::test]
async fn failed_row_removal_undoes_the_release() {
    let (store, coordinator, staff) = seeded().await;
    let ada = &staff.admins[0];
    let department = coordinator
        .assign_on_create(draft("Research"), Some(ada.employee_id))
        .await
        .unwrap();
    let departments_before = store.departments().await;
    let employees_before = store.employees().await;

    // unappoint and the department update go through, the removal fails
    store.fail_after_writes(2);
    let err = coordinator.delete(department.department_id).await.unwrap_err();

    assert!(matches!(err, AssignmentError::StoreUnavailable(_)));
    assert_eq!(store.departments().await, departments_before);
    assert_eq!(store.employees().await, employees_before);
    assert!(store.employee(ada.employee_id).await.unwrap().is_department_manager);

    coordinator.delete(department.department_id).await.unwrap();
    assert!(store.departments().await.is_empty());
    assert_invariants(&store).await;
}

#[tokio::test]
async fn delete_of_missing_department_is_not_found() {
    let (_store, coordinator, _staff) = seeded().await;

    let err = coordinator.delete(77).await.unwrap_err();

    assert_eq!(err, AssignmentError::department_not_found(77));
}

#[tokio::test]
async fn eligible_managers_are_admins_in_key_order() {
    let (_store, coordinator, staff) = seeded().await;
    coordinator
        .assign_on_create(draft("Research"), Some(staff.admins[1].employee_id))
        .await
        .unwrap();

    let eligible = coordinator.eligible_managers().await.unwrap();

    let ids: Vec<_> = eligible.iter().map(|employee| employee.employee_id).collect();
    let expected: Vec<_> = staff.admins.iter().map(|employee| employee.employee_id).collect();
    assert_eq!(ids, expected);
}

#[tokio::test]
async fn views_carry_manager_names() {
    let (_store, coordinator, staff) = seeded().await;
    let research = coordinator
        .assign_on_create(draft("Research"), Some(staff.admins[0].employee_id))
        .await
        .unwrap();
    coordinator.assign_on_create(draft("Sales"), None).await.unwrap();

    let views = coordinator.list().await.unwrap();
    assert_eq!(views.len(), 2);
    assert_eq!(views[0].manager.as_ref().unwrap().name_surname, "Ada Lovelace");
    assert!(views[1].manager.is_none());

    let details = coordinator.details(research.department_id).await.unwrap();
    assert_eq!(details.department, research);
    assert!(matches!(
        coordinator.details(99).await.unwrap_err(),
        AssignmentError::NotFound { entity: Entity::Department, key: 99 }
    ));
}
