//! Typed accessors for Crowdlab resources built on [`AuthenticatedFetcher`].

// self
use crate::{_prelude::*, fetch::AuthenticatedFetcher, http::HttpTransport};

/// Agency record together with its clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
	/// Numeric agency identifier.
	pub id: u64,
	/// Display name.
	pub name: String,
	/// Clients managed by the agency; filled from `agencies/{id}/clients`.
	#[serde(default)]
	pub clients: Vec<Client>,
}

/// Client managed by an agency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
	/// Numeric client identifier.
	pub id: u64,
	/// Display name.
	pub name: String,
}

/// Resource-level facade over an [`AuthenticatedFetcher`].
#[derive(Clone, Debug)]
pub struct CrowdlabApi<C>
where
	C: ?Sized + HttpTransport,
{
	fetcher: AuthenticatedFetcher<C>,
}
impl<C> CrowdlabApi<C>
where
	C: ?Sized + HttpTransport,
{
	/// Wraps an existing fetcher.
	pub fn new(fetcher: AuthenticatedFetcher<C>) -> Self {
		Self { fetcher }
	}

	/// Underlying fetcher, e.g., for endpoints without a typed accessor.
	pub fn fetcher(&self) -> &AuthenticatedFetcher<C> {
		&self.fetcher
	}

	/// Loads an agency and its clients.
	pub async fn agency(&self, id: u64) -> Result<Agency> {
		let mut agency = self.fetcher.get(&format!("agencies/{id}")).await?.json::<Agency>()?;

		agency.clients = self.clients(id).await?;

		Ok(agency)
	}

	/// Lists the clients of an agency.
	pub async fn clients(&self, agency_id: u64) -> Result<Vec<Client>> {
		Ok(self.fetcher.get(&format!("agencies/{agency_id}/clients")).await?.json()?)
	}
}
