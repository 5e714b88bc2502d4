use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use subtle::{Choice, ConstantTimeEq};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum CredentialError {
    #[error("无法读取密钥文件 {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// 进程启动时加载的有效令牌集合，加载后只读
#[derive(Clone, Default)]
pub struct CredentialSet {
    tokens: Vec<String>,
}

impl CredentialSet {
    /// 从文件加载令牌：每行一个，去除首尾空白，忽略空行与 `#` 注释行，去重。
    ///
    /// 文件不存在视为零个令牌；其他读取失败直接返回错误。
    pub fn load(path: &Path) -> Result<Self, CredentialError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let set = Self::parse(&content);
                if set.is_empty() {
                    warn!(
                        "Key file {} contains no keys, all authenticated requests will be rejected",
                        path.display()
                    );
                } else {
                    info!("Loaded {} API key(s) from {}", set.len(), path.display());
                }
                Ok(set)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(
                    "Key file {} not found, all authenticated requests will be rejected",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(CredentialError::Unreadable {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    pub fn parse(content: &str) -> Self {
        let unique: BTreeSet<&str> = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect();

        Self {
            tokens: unique.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();

        Self {
            tokens: unique.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 成员检查：逐个令牌做常量时间比较，且总是扫描全部令牌
    pub fn contains(&self, candidate: &str) -> bool {
        let mut found = Choice::from(0u8);
        for token in &self.tokens {
            found |= token.as_bytes().ct_eq(candidate.as_bytes());
        }
        found.into()
    }

    /// 已加载令牌的长度，用于诊断
    pub fn token_lengths(&self) -> Vec<usize> {
        self.tokens.iter().map(String::len).collect()
    }
}

// 不输出令牌内容
impl fmt::Debug for CredentialSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSet")
            .field("loaded_keys", &self.tokens.len())
            .finish()
    }
}
