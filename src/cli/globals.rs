use secrecy::SecretString;

#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub vault_url: String,
    pub vault_token: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(vurl: String) -> Self {
        Self {
            vault_url: vurl,
            vault_token: SecretString::default(),
        }
    }

    pub fn set_token(&mut self, token: SecretString) {
        self.vault_token = token;
    }
}
