use ofs_action::Action;
use ofs_project::Project;

// Integration-adjacent test: round-trip a funscript through project
// import, the binary container, and back out to a fresh funscript file.
#[test]
fn funscript_import_then_export_round_trips_actions() {
    let dir = tempfile::tempdir().unwrap();
    let funscript_path = dir.path().join("clip.funscript");
    std::fs::write(
        &funscript_path,
        br#"{"version":"1.0","inverted":false,"range":100,"actions":[{"at":0,"pos":0},{"at":500,"pos":100}]}"#,
    )
    .unwrap();

    let project = Project::import_funscript(&funscript_path).unwrap();
    assert_eq!(project.scripts().len(), 1);
    let actions = project.script(0).unwrap().actions().as_slice().to_vec();
    assert_eq!(actions.len(), 2);
    assert_eq!(actions[0], Action::new(0.0, 0));
    assert_eq!(actions[1], Action::new(0.5, 100));

    let out_path = dir.path().join("out.funscript");
    project.export_funscript(&out_path, 0).unwrap();
    let reimported = Project::import_funscript(&out_path).unwrap();
    assert_eq!(reimported.script(0).unwrap().actions().as_slice(), actions);
}

#[test]
fn binary_container_round_trip_through_project_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let funscript_path = dir.path().join("clip.funscript");
    std::fs::write(
        &funscript_path,
        br#"{"version":"1.0","inverted":false,"range":100,"actions":[{"at":100,"pos":20}]}"#,
    )
    .unwrap();

    let mut project = Project::import_funscript(&funscript_path).unwrap();
    let project_path = dir.path().join("clip.ofsproj");
    project.save(&project_path, true).unwrap();

    let reloaded = Project::load(&project_path).unwrap();
    assert_eq!(
        reloaded.script(0).unwrap().actions().as_slice(),
        project.script(0).unwrap().actions().as_slice()
    );
}
