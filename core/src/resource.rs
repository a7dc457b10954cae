//! Generic read and write hooks for REST resources.
//!
//! Every admin collection follows the same pattern: list, fetch one,
//! create, update, delete, sometimes toggle a status flag. [`Collection`]
//! provides those hooks for any [`Resource`] descriptor, and [`Singleton`]
//! does the same for resources with exactly one instance.
//!
//! # Reconciliation
//!
//! | write            | cache effect                                        |
//! |------------------|-----------------------------------------------------|
//! | create           | invalidate `[name]`, prime `detail(id)` if returned |
//! | update / patch   | write `detail(id)` directly, invalidate lists       |
//! | set status       | same as update                                      |
//! | delete           | remove `detail(id)`, invalidate lists               |
//! | singleton writes | write `[name]` directly                             |
//!
//! When a write succeeds but the response does not carry a usable record,
//! the direct write degrades to invalidating the affected key.

use std::marker::PhantomData;

use serde::Serialize;

use crate::envelope::{Page, Unwrap};
use crate::error::ApiError;
use crate::form::FormPayload;
use crate::gateway::Gateway;
use crate::http::HttpMethod;
use crate::keys::Resource;
use crate::mutation::Mutation;
use crate::query::{Query, QueryClient};
use crate::types::{Entity, StatusUpdate};

/// Input of a per-id write: which record, and the body to send.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate<B> {
    pub id: String,
    pub body: B,
}

impl<B> ItemUpdate<B> {
    pub fn new(id: impl Into<String>, body: B) -> Self {
        Self { id: id.into(), body }
    }
}

pub struct Collection<T> {
    gateway: Gateway,
    resource: Resource,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            resource: self.resource,
            _marker: PhantomData,
        }
    }
}

impl<T: Entity> Collection<T> {
    pub fn new(gateway: Gateway, resource: Resource) -> Self {
        Self {
            gateway,
            resource,
            _marker: PhantomData,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    /// The unfiltered list.
    pub fn all(&self) -> Query<Vec<T>> {
        let resource = self.resource;
        self.gateway
            .query(resource.lists(), Unwrap::Field(resource.list_field), move |api| {
                api.build_get(resource.path, &())
            })
    }

    /// The list narrowed by server-side `filters`.
    pub fn list<F>(&self, filters: F) -> Result<Query<Vec<T>>, ApiError>
    where
        F: Serialize + Send + Sync + 'static,
    {
        let resource = self.resource;
        let key = resource.list(&filters)?;
        Ok(self
            .gateway
            .query(key, Unwrap::Field(resource.list_field), move |api| {
                api.build_get(resource.path, &filters)
            }))
    }

    /// A server-paginated list, `data: { <items>, total, page, totalPages }`.
    pub fn paged<F>(&self, filters: F) -> Result<Query<Page<T>>, ApiError>
    where
        F: Serialize + Send + Sync + 'static,
    {
        let resource = self.resource;
        let key = resource.lists().push("paged").with_params(&filters)?;
        Ok(self
            .gateway
            .query(key, Unwrap::Data, move |api| api.build_get(resource.path, &filters)))
    }

    /// One record. Disabled while `id` is empty.
    pub fn detail(&self, id: &str) -> Query<T> {
        let resource = self.resource;
        let path = resource.item_path(id);
        self.gateway
            .query(resource.detail(id), Unwrap::Field(resource.item_field), move |api| {
                api.build_get(&path, &())
            })
            .enabled(!id.is_empty())
    }

    pub fn create<B>(&self) -> Mutation<B, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, body: &B| {
                api.build_json(HttpMethod::Post, resource.path, body)
            })
            .on_success(move |cache, _, created| reconcile_created(cache, resource, created))
    }

    /// Create with a `multipart/form-data` upload.
    pub fn create_form<B: FormPayload>(&self) -> Mutation<B, Option<T>> {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, form: &B| {
                Ok(api.build_form(HttpMethod::Post, resource.path, &form.to_form()))
            })
            .on_success(move |cache, _, created| reconcile_created(cache, resource, created))
    }

    /// `PUT /:id`.
    pub fn update<B>(&self) -> Mutation<ItemUpdate<B>, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        self.item_write(HttpMethod::Put)
    }

    /// `PATCH /:id`.
    pub fn patch<B>(&self) -> Mutation<ItemUpdate<B>, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        self.item_write(HttpMethod::Patch)
    }

    /// `PUT /:id` with a `multipart/form-data` upload.
    pub fn update_form<B: FormPayload>(&self) -> Mutation<ItemUpdate<B>, Option<T>> {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, input: &ItemUpdate<B>| {
                Ok(api.build_form(HttpMethod::Put, &resource.item_path(&input.id), &input.body.to_form()))
            })
            .on_success(move |cache, input, updated| reconcile_item(cache, resource, &input.id, updated))
    }

    /// `PATCH /:id/status`.
    pub fn set_status(&self) -> Mutation<ItemUpdate<StatusUpdate>, Option<T>> {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, input: &ItemUpdate<StatusUpdate>| {
                let path = format!("{}/status", resource.item_path(&input.id));
                api.build_json(HttpMethod::Patch, &path, &input.body)
            })
            .on_success(move |cache, input, updated| reconcile_item(cache, resource, &input.id, updated))
    }

    /// `DELETE /:id`; the input is the id.
    pub fn delete(&self) -> Mutation<String, ()> {
        let resource = self.resource;
        self.gateway
            .command(move |api, id: &String| Ok(api.build_empty(HttpMethod::Delete, &resource.item_path(id))))
            .on_success(move |cache, id, _| {
                cache.remove_query(&resource.detail(id));
                cache.invalidate(&resource.lists());
            })
    }

    fn item_write<B>(&self, method: HttpMethod) -> Mutation<ItemUpdate<B>, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, input: &ItemUpdate<B>| {
                api.build_json(method, &resource.item_path(&input.id), &input.body)
            })
            .on_success(move |cache, input, updated| reconcile_item(cache, resource, &input.id, updated))
    }
}

fn reconcile_created<T: Entity>(cache: &QueryClient, resource: Resource, created: &Option<T>) {
    cache.invalidate(&resource.all());
    if let Some(created) = created {
        cache.set_query_data(resource.detail(created.id()), created.clone());
    }
}

fn reconcile_item<T: Entity>(cache: &QueryClient, resource: Resource, id: &str, updated: &Option<T>) {
    match updated {
        Some(updated) => cache.set_query_data(resource.detail(id), updated.clone()),
        None => {
            cache.invalidate(&resource.detail(id));
        }
    }
    cache.invalidate(&resource.lists());
}

/// A resource with one instance and one cache slot, `[name]`.
pub struct Singleton<T> {
    gateway: Gateway,
    resource: Resource,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Singleton<T> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
            resource: self.resource,
            _marker: PhantomData,
        }
    }
}

impl<T> Singleton<T>
where
    T: serde::de::DeserializeOwned + Serialize + Clone + Send + Sync + 'static,
{
    pub fn new(gateway: Gateway, resource: Resource) -> Self {
        Self {
            gateway,
            resource,
            _marker: PhantomData,
        }
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn get(&self) -> Query<T> {
        let resource = self.resource;
        self.gateway
            .query(resource.all(), Unwrap::Field(resource.item_field), move |api| {
                api.build_get(resource.path, &())
            })
    }

    pub fn update<B>(&self) -> Mutation<B, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        self.write(HttpMethod::Put, "")
    }

    pub fn patch<B>(&self) -> Mutation<B, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        self.write(HttpMethod::Patch, "")
    }

    /// A write to a sub-path such as `/settings/theme`. The response is
    /// expected to carry the whole singleton.
    pub fn write<B>(&self, method: HttpMethod, sub_path: &'static str) -> Mutation<B, Option<T>>
    where
        B: Serialize + Clone + Send + Sync + 'static,
    {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, body: &B| {
                api.build_json(method, &format!("{}{sub_path}", resource.path), body)
            })
            .on_success(move |cache, _, updated| reconcile_singleton(cache, resource, updated))
    }

    /// A body-less write to a sub-path, e.g. `POST /settings/reset`.
    pub fn action(&self, method: HttpMethod, sub_path: &'static str) -> Mutation<(), Option<T>> {
        let resource = self.resource;
        self.gateway
            .mutation(resource.item_field, move |api, _: &()| {
                Ok(api.build_empty(method, &format!("{}{sub_path}", resource.path)))
            })
            .on_success(move |cache, _, updated| reconcile_singleton(cache, resource, updated))
    }
}

fn reconcile_singleton<T>(cache: &QueryClient, resource: Resource, updated: &Option<T>)
where
    T: Clone + Send + Sync + 'static,
{
    match updated {
        Some(updated) => cache.set_query_data(resource.all(), updated.clone()),
        None => {
            cache.invalidate(&resource.all());
        }
    }
}
