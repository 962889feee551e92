mod cli;

use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use eeprom_fs::{
    split_path, Config, DirHandle, EepromFileSystem, FileAttr, FsError, OpenMode, BLOCK_SIZE,
};
use eeprom_fs_fuse::BlockFile;
use enumflags2::BitFlags;

use self::cli::{Cli, Command, VolumeCommand};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::new().read_only(cli.read_only).trace(cli.trace);
    log::debug!("image={:?} {config:?}", cli.image);

    match cli.command {
        Command::Format { kb } => {
            let efs = format_image(&cli.image, kb, config)?;
            println!("formatted {kb}KB, {} blocks", efs.total_blocks());
            Ok(())
        }
        Command::Volume(command) => {
            let mut efs = mount_image(&cli.image, config)?;
            run(&mut efs, command).map_err(fs_or_io)
        }
    }
}

/// 只读时在创建镜像文件之前就拒绝
fn format_image(image: &Path, kb: u16, config: Config) -> io::Result<EepromFileSystem> {
    if config.read_only {
        return Err(fs_error(FsError::AccessDenied));
    }
    let dev = BlockFile::create(image, u64::from(kb) * 1024)?;
    EepromFileSystem::format(Arc::new(dev), kb, config).map_err(fs_error)
}

fn mount_image(image: &Path, config: Config) -> io::Result<EepromFileSystem> {
    let dev = BlockFile::open(image, !config.read_only)?;
    EepromFileSystem::mount(Arc::new(dev), config).map_err(fs_error)
}

/// 命令执行中可能来自文件系统，也可能来自主机
#[derive(Debug)]
enum ToolError {
    Fs(FsError),
    Io(io::Error),
}

impl From<FsError> for ToolError {
    fn from(err: FsError) -> Self {
        Self::Fs(err)
    }
}

impl From<io::Error> for ToolError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

fn fs_or_io(err: ToolError) -> io::Error {
    match err {
        ToolError::Fs(err) => fs_error(err),
        ToolError::Io(err) => err,
    }
}

fn fs_error(err: FsError) -> io::Error {
    let kind = match err {
        FsError::NotFound => io::ErrorKind::NotFound,
        FsError::DuplicatedFileName => io::ErrorKind::AlreadyExists,
        FsError::AccessDenied => io::ErrorKind::PermissionDenied,
        FsError::EndOfFile => io::ErrorKind::UnexpectedEof,
        FsError::InvalidFileName
        | FsError::InvalidSeek
        | FsError::InvalidHandle
        | FsError::InvalidCapacity => io::ErrorKind::InvalidInput,
        FsError::NotFormatted | FsError::Corrupted => io::ErrorKind::InvalidData,
        FsError::DiskFull | FsError::Device(_) => io::ErrorKind::Other,
    };
    io::Error::new(kind, err.to_string())
}

/// `/dir/file`拆成打开的目录与文件名
fn locate<'a>(efs: &EepromFileSystem, path: &'a str) -> Result<(DirHandle, &'a str), FsError> {
    let (dir, name) = split_path(path).ok_or(FsError::InvalidFileName)?;
    Ok((efs.open_dir(dir)?, name))
}

fn read_all(efs: &mut EepromFileSystem, path: &str) -> Result<Vec<u8>, FsError> {
    let (dir, name) = locate(efs, path)?;
    let mut file = efs.open(&dir, name, OpenMode::Read)?;
    let mut data = Vec::with_capacity(file.size() as usize);
    let mut buf = [0; BLOCK_SIZE];
    loop {
        match efs.read(&mut file, &mut buf) {
            Ok(n) => data.extend_from_slice(&buf[..n]),
            Err(FsError::EndOfFile) => break,
            Err(err) => return Err(err),
        }
    }
    efs.close(&mut file)?;
    Ok(data)
}

fn list_files(efs: &EepromFileSystem, dir: &mut DirHandle) -> Result<(), FsError> {
    efs.find_first_file(dir)?;
    loop {
        match efs.find_next_file(dir) {
            Ok(file) => {
                let attrs = file.attributes();
                let flag = |attr: FileAttr, c: char| if attrs.contains(attr) { c } else { '-' };
                println!(
                    "{}{}{}{} {:>8} {}",
                    flag(FileAttr::ReadOnly, 'r'),
                    flag(FileAttr::Hidden, 'h'),
                    flag(FileAttr::System, 's'),
                    flag(FileAttr::Archive, 'a'),
                    file.size(),
                    file.name()
                );
            }
            Err(FsError::NotFound) => return Ok(()),
            Err(err) => return Err(err),
        }
    }
}

fn run(efs: &mut EepromFileSystem, command: VolumeCommand) -> Result<(), ToolError> {
    match command {
        VolumeCommand::Mkdir { dir } => efs.create_dir(&dir)?,
        VolumeCommand::Rmdir { dir } => efs.delete_dir_by_name(&dir)?,
        VolumeCommand::Mvdir { from, to } => {
            let dir = efs.open_dir(&from)?;
            efs.rename_dir(&dir, &to)?;
        }
        VolumeCommand::Ls { dir } => {
            let dir = dir.as_deref().unwrap_or("/");
            let mut handle = efs.open_dir(dir)?;
            if handle.is_root() {
                let mut listing = efs.find_first_dir();
                loop {
                    match efs.find_next_dir(&mut listing) {
                        Ok(entry) => println!("d        - {}", entry.name()),
                        Err(FsError::NotFound) => break,
                        Err(err) => return Err(err.into()),
                    }
                }
            }
            list_files(efs, &mut handle)?;
        }
        VolumeCommand::Put { host, path } => {
            let data = fs::read(&host)?;
            let (dir, name) = locate(efs, &path)?;
            let mut file = efs.open(&dir, name, OpenMode::Write)?;
            efs.write(&mut file, &data)?;
            efs.close(&mut file)?;
            log::info!("{} bytes -> {path}", data.len());
        }
        VolumeCommand::Get { path, host } => {
            let data = read_all(efs, &path)?;
            fs::write(&host, &data)?;
            log::info!("{path} -> {} bytes", data.len());
        }
        VolumeCommand::Cat { path } => {
            let data = read_all(efs, &path)?;
            io::stdout().write_all(&data)?;
        }
        VolumeCommand::Rm { path } => {
            let (dir, name) = locate(efs, &path)?;
            efs.erase(&dir, name)?;
        }
        VolumeCommand::Df => {
            let (total, used, free) = (efs.total_blocks(), efs.used_blocks(), efs.free_blocks());
            println!("{:>8} {:>8}", "blocks", "bytes");
            println!("{total:>8} {:>8} total", total as usize * BLOCK_SIZE);
            println!("{used:>8} {:>8} used", used as usize * BLOCK_SIZE);
            println!("{free:>8} {:>8} free", free as usize * BLOCK_SIZE);
        }
        VolumeCommand::Attr {
            path,
            read_only,
            hidden,
            system,
            archive,
        } => {
            let mut attrs = BitFlags::<FileAttr>::empty();
            for (set, attr) in [
                (read_only, FileAttr::ReadOnly),
                (hidden, FileAttr::Hidden),
                (system, FileAttr::System),
                (archive, FileAttr::Archive),
            ] {
                if set {
                    attrs |= attr;
                }
            }
            let (dir, name) = locate(efs, &path)?;
            efs.set_attributes(&dir, name, attrs)?;
        }
    }
    Ok(())
}
