/// 将绝对路径拆成目录名与文件名。
///
/// 命名空间只有一层目录：`/a.txt`在根目录，`/docs/a.txt`在`/docs`中，
/// 相对路径、以`/`结尾或更深的路径都不合法。
pub fn split_path(path: &str) -> Option<(&str, &str)> {
    let rest = path.strip_prefix('/')?;
    match rest.split_once('/') {
        None if rest.is_empty() => None,
        None => Some(("/", rest)),
        Some((dir, file)) if dir.is_empty() || file.is_empty() || file.contains('/') => None,
        Some((dir, file)) => Some((&path[..dir.len() + 1], file)),
    }
}
