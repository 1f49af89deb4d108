use crate::agent::claude::{decode_project_dir_name, encode_project_path};

#[test]
fn test_encode_project_path() {
    // Basic path
    assert_eq!(
        encode_project_path("/Users/ozan/Projects/dashboard"),
        "-Users-ozan-Projects-dashboard"
    );

    // Path with hidden folder
    assert_eq!(
        encode_project_path("/Users/ozan/Projects/service/.worktrees/docker"),
        "-Users-ozan-Projects-service--worktrees-docker"
    );

    // Subfolder path (no hidden folders)
    assert_eq!(
        encode_project_path("/Users/ozan/Projects/app/demos/test"),
        "-Users-ozan-Projects-app-demos-test"
    );
}

#[test]
fn test_decode_project_dir_name() {
    assert_eq!(
        decode_project_dir_name("-Users-ozan-Projects-dashboard"),
        "/Users/ozan/Projects/dashboard"
    );

    // Double dashes decode to hidden folders
    assert_eq!(
        decode_project_dir_name("-Users-ozan-Projects-service--worktrees-docker"),
        "/Users/ozan/Projects/service/.worktrees/docker"
    );

    assert_eq!(
        decode_project_dir_name("-Users-ozan-Projects"),
        "/Users/ozan/Projects"
    );
}

#[test]
fn test_codec_round_trip_for_ordinary_paths() {
    // Lossless for paths whose segments carry no dashes
    for path in [
        "/Users/ozan/Projects/dashboard",
        "/home/user/work/service",
        "/tmp/proj",
        "/Users/ozan/Projects/service/.worktrees/docker",
        "/srv/.config/app",
    ] {
        assert_eq!(
            decode_project_dir_name(&encode_project_path(path)),
            path,
            "round trip failed for {}",
            path
        );
    }
}

#[test]
fn test_codec_dash_ambiguity_is_stable() {
    // A dash inside a segment is indistinguishable from a separator once
    // encoded. The decode is heuristic and documented; matching always goes
    // through encode() on a real cwd, never through decode().
    let encoded = encode_project_path("/Users/ozan/Projects/my-app");
    assert_eq!(encoded, "-Users-ozan-Projects-my-app");
    assert_eq!(decode_project_dir_name(&encoded), "/Users/ozan/Projects/my/app");
}
